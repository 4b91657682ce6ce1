//! Lowering of the surface AST into the core calculus.
//!
//! The transformation is pure and total. Each produced node is wrapped in a
//! span annotation inherited from the surface node it came from, so every
//! core node can be traced back to source.
//!
//! Objects lower into a recursive `let`: the object value is bound under the
//! name `self`, the outermost object additionally binds `$`, and object
//! locals join the same binding group. Late binding of `self` across
//! composition is then a matter of shadowing that binding (see
//! `eval::compose`).

use std::rc::Rc;

use smallvec::SmallVec;

use crate::{
    ast::{self, Arg, Expr, ExprKind, FieldKey, Literal},
    ir::{Args, CompKind, Core, CoreArg, Field, Strictness},
    number::Scientific,
};

/// The binder introduced around every object literal.
const SELF: &str = "self";
/// The binder aliasing the outermost object.
const DOLLAR: &str = "$";
/// The tuple variable of a lowered object comprehension. The leading `$`
/// keeps it out of the surface identifier namespace, so user bindings can
/// never be captured.
const OBJ_COMP_TUPLE: &str = "$arr";

/// Lowers a whole program. The root is outermost: the first object literal
/// on any path from here binds `$`.
pub(crate) fn desugar(program: &Expr) -> Rc<Core> {
    desugar_expr(program, true)
}

fn desugar_expr(expr: &Expr, outermost: bool) -> Rc<Core> {
    let inner = match &expr.kind {
        ExprKind::Lit(lit) => Rc::new(Core::Lit(lit.clone())),
        ExprKind::Ident(name) => Rc::new(Core::Var(name.clone())),
        ExprKind::Fun { params, body } => Rc::new(Core::Fun {
            params: params
                .iter()
                .map(|p| {
                    (
                        p.name.clone(),
                        p.default.as_ref().map(|d| desugar_expr(d, outermost)),
                    )
                })
                .collect::<Vec<_>>()
                .into(),
            body: desugar_expr(body, outermost),
        }),
        ExprKind::Apply { target, args } => Rc::new(Core::App {
            target: desugar_expr(target, outermost),
            args: desugar_args(args, outermost),
        }),
        ExprKind::Local { binds, body } => Rc::new(Core::Let {
            binds: binds
                .iter()
                .map(|b| (b.name.clone(), desugar_expr(&b.value, outermost)))
                .collect(),
            body: desugar_expr(body, outermost),
        }),
        ExprKind::BinOp { op, left, right } => Rc::new(Core::BinOp {
            op: *op,
            left: desugar_expr(left, outermost),
            right: desugar_expr(right, outermost),
        }),
        ExprKind::UnyOp { op, operand } => Rc::new(Core::UnyOp {
            op: *op,
            operand: desugar_expr(operand, outermost),
        }),
        ExprKind::IfElse {
            cond,
            then_branch,
            else_branch,
        } => Rc::new(Core::IfElse {
            cond: desugar_expr(cond, outermost),
            then_branch: desugar_expr(then_branch, outermost),
            else_branch: desugar_expr(else_branch, outermost),
        }),
        ExprKind::If { cond, then_branch } => Rc::new(Core::IfElse {
            cond: desugar_expr(cond, outermost),
            then_branch: desugar_expr(then_branch, outermost),
            else_branch: Rc::new(Core::Lit(Literal::Null)),
        }),
        ExprKind::Arr(items) => Rc::new(Core::Arr(
            items.iter().map(|item| desugar_expr(item, outermost)).collect(),
        )),
        ExprKind::Obj {
            fields,
            locals,
            asserts,
        } => desugar_object(fields, locals, asserts, outermost),
        ExprKind::Lookup { target, field } => Rc::new(Core::Lookup {
            target: desugar_expr(target, outermost),
            key: Rc::new(Core::Lit(Literal::String(field.clone()))),
        }),
        ExprKind::Index { target, index } => Rc::new(Core::Lookup {
            target: desugar_expr(target, outermost),
            key: desugar_expr(index, outermost),
        }),
        ExprKind::Err(message) => Rc::new(Core::Err(desugar_expr(message, outermost))),
        ExprKind::Assert { assert, rest } => Rc::new(Core::IfElse {
            cond: desugar_expr(&assert.cond, outermost),
            then_branch: desugar_expr(rest, outermost),
            else_branch: Rc::new(Core::Err(assert_message(assert.msg.as_ref(), outermost))),
        }),
        ExprKind::Slice {
            target,
            start,
            end,
            step,
        } => desugar_slice(target, start.as_deref(), end.as_deref(), step.as_deref(), outermost),
        ExprKind::ArrComp { body, comp } => {
            desugar_arr_comp(desugar_expr(body, outermost), comp, outermost)
        }
        ExprKind::ObjComp {
            field,
            comp,
            locals,
        } => desugar_obj_comp(field, comp, locals),
    };
    Rc::new(Core::Loc {
        span: expr.span,
        inner,
    })
}

fn desugar_args(args: &[Arg], outermost: bool) -> Args {
    Args {
        list: args
            .iter()
            .map(|arg| match arg {
                Arg::Pos(e) => CoreArg::Pos(desugar_expr(e, outermost)),
                Arg::Named(name, e) => CoreArg::Named(name.clone(), desugar_expr(e, outermost)),
            })
            .collect(),
        strictness: Strictness::Lazy,
    }
}

fn assert_message(msg: Option<&Expr>, outermost: bool) -> Rc<Core> {
    match msg {
        Some(m) => desugar_expr(m, outermost),
        None => Rc::new(Core::Lit(Literal::String("Assertion failed".into()))),
    }
}

/// `target[start:end:step]` becomes a call to `std.slice`. Missing slice
/// components are passed as `null` and defaulted by the library function.
fn desugar_slice(
    target: &Expr,
    start: Option<&Expr>,
    end: Option<&Expr>,
    step: Option<&Expr>,
    outermost: bool,
) -> Rc<Core> {
    let maybe_null = |component: Option<&Expr>| match component {
        Some(e) => CoreArg::Pos(desugar_expr(e, outermost)),
        None => CoreArg::Pos(Rc::new(Core::Lit(Literal::Null))),
    };
    let mut list = SmallVec::new();
    list.push(CoreArg::Pos(desugar_expr(target, outermost)));
    list.push(maybe_null(start));
    list.push(maybe_null(end));
    list.push(maybe_null(step));
    Rc::new(Core::App {
        target: Rc::new(Core::Lookup {
            target: Rc::new(Core::Var("std".into())),
            key: Rc::new(Core::Lit(Literal::String("slice".into()))),
        }),
        args: Args {
            list,
            strictness: Strictness::Lazy,
        },
    })
}

/// `{ fields, locals, asserts }` becomes
/// `let rec self = <obj>[, $ = self], locals... in self`.
///
/// Everything inside the object desugars with `outermost = false`: only the
/// first object on a path from the root binds `$`.
fn desugar_object(
    fields: &[ast::ObjField],
    locals: &[ast::Bind],
    asserts: &[ast::Assert],
    outermost: bool,
) -> Rc<Core> {
    let fields = fields
        .iter()
        .map(|field| desugar_field(field, false))
        .collect();
    let asserts = asserts
        .iter()
        .map(|assert| {
            Rc::new(Core::IfElse {
                cond: desugar_expr(&assert.cond, false),
                then_branch: Rc::new(Core::Lit(Literal::Null)),
                else_branch: Rc::new(Core::Err(assert_message(assert.msg.as_ref(), false))),
            })
        })
        .collect();

    let self_name: Rc<str> = SELF.into();
    let mut binds = vec![(self_name.clone(), Rc::new(Core::Obj { fields, asserts }))];
    if outermost {
        binds.push((DOLLAR.into(), Rc::new(Core::Var(self_name.clone()))));
    }
    binds.extend(
        locals
            .iter()
            .map(|b| (b.name.clone(), desugar_expr(&b.value, false))),
    );
    Rc::new(Core::Let {
        binds,
        body: Rc::new(Core::Var(self_name)),
    })
}

fn desugar_field(field: &ast::ObjField, outermost: bool) -> Field {
    Field {
        key: match &field.key {
            FieldKey::Fixed(name) => Rc::new(Core::Lit(Literal::String(name.clone()))),
            FieldKey::Computed(e) => desugar_expr(e, outermost),
        },
        value: desugar_expr(&field.value, outermost),
        visibility: field.visibility,
    }
}

/// Right fold of the comprehension specs: the first spec produces the
/// outermost loop, so later specs vary fastest. The accumulator starts as a
/// singleton array of the desugared body; each element of a comprehension
/// body is an array to splice into the result.
fn desugar_arr_comp(body: Rc<Core>, comp: &[ast::CompSpec], outermost: bool) -> Rc<Core> {
    let mut acc = Rc::new(Core::Arr(vec![body]));
    for spec in comp.iter().rev() {
        acc = Rc::new(Core::Comp {
            kind: CompKind::Arr {
                var: spec.var.clone(),
                body: acc,
                cond: spec.cond.as_ref().map(|c| desugar_expr(c, outermost)),
            },
            source: desugar_expr(&spec.iter, outermost),
        });
    }
    acc
}

/// An object comprehension reduces to an array comprehension producing one
/// tuple of the iteration variables per emitted field, wrapped in an object
/// comprehension node that recovers each variable by indexing the tuple.
fn desugar_obj_comp(field: &ast::ObjField, comp: &[ast::CompSpec], locals: &[ast::Bind]) -> Rc<Core> {
    let vars: Vec<Rc<str>> = comp.iter().map(|spec| spec.var.clone()).collect();
    let tuple = Rc::new(Core::Arr(
        vars.iter().map(|v| Rc::new(Core::Var(v.clone()))).collect(),
    ));
    let source = desugar_arr_comp(tuple, comp, false);

    // Recover `x, y, ...` from the tuple in both the key and the value; the
    // value additionally sees the comprehension's locals.
    let var_binds: Vec<(Rc<str>, Rc<Core>)> = vars
        .iter()
        .enumerate()
        .map(|(index, var)| {
            let lookup = Rc::new(Core::Lookup {
                target: Rc::new(Core::Var(OBJ_COMP_TUPLE.into())),
                key: Rc::new(Core::Lit(Literal::Number(Scientific::from_i64(
                    index as i64,
                )))),
            });
            (var.clone(), lookup)
        })
        .collect();
    let lowered = desugar_field(field, false);
    let mut value_binds = var_binds.clone();
    value_binds.extend(
        locals
            .iter()
            .map(|b| (b.name.clone(), desugar_expr(&b.value, false))),
    );
    let field = Field {
        key: Rc::new(Core::Let {
            binds: var_binds,
            body: lowered.key,
        }),
        value: Rc::new(Core::Let {
            binds: value_binds,
            body: lowered.value,
        }),
        visibility: lowered.visibility,
    };
    Rc::new(Core::Comp {
        kind: CompKind::Obj {
            var: OBJ_COMP_TUPLE.into(),
            field,
        },
        source,
    })
}
