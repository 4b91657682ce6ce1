//! Shared surface-AST builders for the integration suites.
//!
//! The parser is an external collaborator, so tests construct surface trees
//! directly. Spans default to a small synthetic range; error-rendering tests
//! rely on its fixed shape.
#![allow(dead_code)]

use jonnet::{
    NoTrace, Runner, Scientific,
    ast::{
        Arg, Assert, BinOp, Bind, CompSpec, Expr, ExprKind, FieldKey, Literal, ObjField, Param,
        UnyOp, Visibility,
    },
    span::{CodeLoc, CodeRange},
    std_object,
};

pub fn sp() -> CodeRange {
    CodeRange::new(CodeLoc::new(1, 1), CodeLoc::new(1, 2))
}

pub fn e(kind: ExprKind) -> Expr {
    Expr::new(kind, sp())
}

pub fn null() -> Expr {
    e(ExprKind::Lit(Literal::Null))
}

pub fn boolean(value: bool) -> Expr {
    e(ExprKind::Lit(Literal::Bool(value)))
}

pub fn num(value: i64) -> Expr {
    e(ExprKind::Lit(Literal::Number(Scientific::from_i64(value))))
}

/// A number literal from source text, e.g. `number("1.5")`.
pub fn number(text: &str) -> Expr {
    e(ExprKind::Lit(Literal::Number(
        Scientific::parse(text).expect("test literal parses"),
    )))
}

pub fn str_(value: &str) -> Expr {
    e(ExprKind::Lit(Literal::String(value.into())))
}

pub fn ident(name: &str) -> Expr {
    e(ExprKind::Ident(name.into()))
}

pub fn arr(items: Vec<Expr>) -> Expr {
    e(ExprKind::Arr(items))
}

pub fn bin(left: Expr, op: BinOp, right: Expr) -> Expr {
    e(ExprKind::BinOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

pub fn uny(op: UnyOp, operand: Expr) -> Expr {
    e(ExprKind::UnyOp {
        op,
        operand: Box::new(operand),
    })
}

pub fn if_else(cond: Expr, then_branch: Expr, else_branch: Expr) -> Expr {
    e(ExprKind::IfElse {
        cond: Box::new(cond),
        then_branch: Box::new(then_branch),
        else_branch: Box::new(else_branch),
    })
}

pub fn if_then(cond: Expr, then_branch: Expr) -> Expr {
    e(ExprKind::If {
        cond: Box::new(cond),
        then_branch: Box::new(then_branch),
    })
}

pub fn bind(name: &str, value: Expr) -> Bind {
    Bind {
        name: name.into(),
        value,
    }
}

pub fn local(binds: Vec<(&str, Expr)>, body: Expr) -> Expr {
    e(ExprKind::Local {
        binds: binds
            .into_iter()
            .map(|(name, value)| bind(name, value))
            .collect(),
        body: Box::new(body),
    })
}

pub fn param(name: &str) -> Param {
    Param {
        name: name.into(),
        default: None,
    }
}

pub fn param_def(name: &str, default: Expr) -> Param {
    Param {
        name: name.into(),
        default: Some(default),
    }
}

pub fn fun(params: Vec<Param>, body: Expr) -> Expr {
    e(ExprKind::Fun {
        params,
        body: Box::new(body),
    })
}

pub fn pos(value: Expr) -> Arg {
    Arg::Pos(value)
}

pub fn named(name: &str, value: Expr) -> Arg {
    Arg::Named(name.into(), value)
}

pub fn call(target: Expr, args: Vec<Arg>) -> Expr {
    e(ExprKind::Apply {
        target: Box::new(target),
        args,
    })
}

pub fn call_pos(target: Expr, args: Vec<Expr>) -> Expr {
    call(target, args.into_iter().map(pos).collect())
}

pub fn dot(target: Expr, field: &str) -> Expr {
    e(ExprKind::Lookup {
        target: Box::new(target),
        field: field.into(),
    })
}

pub fn index(target: Expr, index: Expr) -> Expr {
    e(ExprKind::Index {
        target: Box::new(target),
        index: Box::new(index),
    })
}

pub fn slice(target: Expr, start: Option<Expr>, end: Option<Expr>, step: Option<Expr>) -> Expr {
    e(ExprKind::Slice {
        target: Box::new(target),
        start: start.map(Box::new),
        end: end.map(Box::new),
        step: step.map(Box::new),
    })
}

pub fn field(name: &str, visibility: Visibility, value: Expr) -> ObjField {
    ObjField {
        key: FieldKey::Fixed(name.into()),
        value,
        visibility,
    }
}

pub fn computed_field(key: Expr, visibility: Visibility, value: Expr) -> ObjField {
    ObjField {
        key: FieldKey::Computed(key),
        value,
        visibility,
    }
}

/// An object literal of visible fields.
pub fn obj(fields: Vec<(&str, Expr)>) -> Expr {
    obj_vis(
        fields
            .into_iter()
            .map(|(name, value)| (name, Visibility::Visible, value))
            .collect(),
    )
}

pub fn obj_vis(fields: Vec<(&str, Visibility, Expr)>) -> Expr {
    e(ExprKind::Obj {
        fields: fields
            .into_iter()
            .map(|(name, visibility, value)| field(name, visibility, value))
            .collect(),
        locals: vec![],
        asserts: vec![],
    })
}

pub fn obj_full(fields: Vec<ObjField>, locals: Vec<Bind>, asserts: Vec<Assert>) -> Expr {
    e(ExprKind::Obj {
        fields,
        locals,
        asserts,
    })
}

pub fn comp_spec(var: &str, iter: Expr, cond: Option<Expr>) -> CompSpec {
    CompSpec {
        var: var.into(),
        iter,
        cond,
    }
}

pub fn arr_comp(body: Expr, comp: Vec<CompSpec>) -> Expr {
    e(ExprKind::ArrComp {
        body: Box::new(body),
        comp,
    })
}

pub fn obj_comp(field: ObjField, comp: Vec<CompSpec>) -> Expr {
    e(ExprKind::ObjComp {
        field: Box::new(field),
        comp,
        locals: vec![],
    })
}

pub fn err(message: Expr) -> Expr {
    e(ExprKind::Err(Box::new(message)))
}

pub fn assert_expr(cond: Expr, msg: Option<Expr>, rest: Expr) -> Expr {
    e(ExprKind::Assert {
        assert: Box::new(Assert { cond, msg }),
        rest: Box::new(rest),
    })
}

/// `std.<name>(args...)` with positional arguments.
pub fn std_call(name: &str, args: Vec<Expr>) -> Expr {
    call_pos(dot(ident("std"), name), args)
}

pub fn run(program: &Expr) -> Result<serde_json::Value, jonnet::Error> {
    Runner::new("test.jsonnet").run_with(program, std_object(), &mut NoTrace)
}

pub fn run_ok(program: &Expr) -> serde_json::Value {
    match run(program) {
        Ok(json) => json,
        Err(error) => panic!("evaluation failed:\n{error}"),
    }
}

/// Runs a program expected to fail and returns the rendered error.
pub fn run_err(program: &Expr) -> String {
    match run(program) {
        Ok(json) => panic!("expected an error, got {json}"),
        Err(error) => error.to_string(),
    }
}
