//! Static checks over the core calculus.
//!
//! A pure pre-order traversal that reports the first lexical problem it
//! finds: duplicate function parameters, duplicate `local` bindings, or a
//! positional argument after a named one. On success the program is used
//! unchanged.

use ahash::AHashSet;

use crate::{
    error::{CheckError, CheckErrorKind},
    ir::{CompKind, Core, CoreArg},
    span::CodeRange,
};

pub(crate) fn check(program: &Core) -> Result<(), CheckError> {
    Checker {
        span: CodeRange::default(),
    }
    .visit(program)
}

/// Tracks the nearest enclosing span so errors point at source.
struct Checker {
    span: CodeRange,
}

impl Checker {
    fn fail(&self, kind: CheckErrorKind) -> CheckError {
        CheckError {
            kind,
            span: self.span,
        }
    }

    fn visit(&mut self, expr: &Core) -> Result<(), CheckError> {
        match expr {
            Core::Loc { span, inner } => {
                let saved = self.span;
                self.span = *span;
                self.visit(inner)?;
                self.span = saved;
                Ok(())
            }
            Core::Lit(_) | Core::Var(_) => Ok(()),
            Core::Fun { params, body } => {
                let mut seen = AHashSet::with_capacity(params.len());
                for (name, _) in params.iter() {
                    if !seen.insert(name.clone()) {
                        return Err(self.fail(CheckErrorKind::DuplicateParam(name.to_string())));
                    }
                }
                for (_, default) in params.iter() {
                    if let Some(default) = default {
                        self.visit(default)?;
                    }
                }
                self.visit(body)
            }
            Core::App { target, args } => {
                let mut named_seen = false;
                for arg in &args.list {
                    match arg {
                        CoreArg::Pos(_) if named_seen => {
                            return Err(self.fail(CheckErrorKind::PosAfterNamedParam));
                        }
                        CoreArg::Pos(_) => {}
                        CoreArg::Named(..) => named_seen = true,
                    }
                }
                self.visit(target)?;
                for arg in &args.list {
                    match arg {
                        CoreArg::Pos(e) | CoreArg::Named(_, e) => self.visit(e)?,
                    }
                }
                Ok(())
            }
            Core::Let { binds, body } => {
                let mut seen = AHashSet::with_capacity(binds.len());
                for (name, _) in binds {
                    if !seen.insert(name.clone()) {
                        return Err(self.fail(CheckErrorKind::DuplicateBinding(name.to_string())));
                    }
                }
                for (_, value) in binds {
                    self.visit(value)?;
                }
                self.visit(body)
            }
            Core::BinOp { left, right, .. } => {
                self.visit(left)?;
                self.visit(right)
            }
            Core::UnyOp { operand, .. } => self.visit(operand),
            Core::IfElse {
                cond,
                then_branch,
                else_branch,
            } => {
                self.visit(cond)?;
                self.visit(then_branch)?;
                self.visit(else_branch)
            }
            Core::Arr(items) => {
                for item in items {
                    self.visit(item)?;
                }
                Ok(())
            }
            Core::Obj { fields, asserts } => {
                for field in fields {
                    self.visit(&field.key)?;
                    self.visit(&field.value)?;
                }
                for assert in asserts {
                    self.visit(assert)?;
                }
                Ok(())
            }
            Core::Lookup { target, key } => {
                self.visit(target)?;
                self.visit(key)
            }
            Core::Err(message) => self.visit(message),
            Core::Comp { kind, source } => {
                self.visit(source)?;
                match kind {
                    CompKind::Arr { body, cond, .. } => {
                        if let Some(cond) = cond {
                            self.visit(cond)?;
                        }
                        self.visit(body)
                    }
                    CompKind::Obj { field, .. } => {
                        self.visit(&field.key)?;
                        self.visit(&field.value)
                    }
                }
            }
        }
    }
}
