//! Object introspection and equality builtins.

use std::rc::Rc;

use crate::{
    error::{EvalError, EvalResult},
    eval::Evaluator,
    value::{Thunk, Value},
};

/// Visible field names, lexicographically sorted.
pub(super) fn object_fields(ev: &mut Evaluator<'_>, value: &Value) -> EvalResult<Value> {
    let obj = ev.want_obj(value)?;
    let names: Vec<Thunk> = obj
        .field_names(false)
        .into_iter()
        .map(|name| Thunk::forced(Value::Str(name)))
        .collect();
    Ok(Value::Arr(Rc::new(names)))
}

pub(super) fn object_has(
    ev: &mut Evaluator<'_>,
    value: &Value,
    field: &Value,
    include_hidden: bool,
) -> EvalResult<Value> {
    let obj = ev.want_obj(value)?;
    let field = ev.want_str(field)?;
    Ok(Value::Bool(obj.has(field, include_hidden)))
}

/// `std.assertEqual`: `true` when equal, otherwise an assertion failure
/// showing both operands.
pub(super) fn assert_equal(ev: &mut Evaluator<'_>, a: &Value, b: &Value) -> EvalResult<Value> {
    if ev.equals(a, b)? {
        return Ok(Value::Bool(true));
    }
    let a = ev.to_display_string(a)?;
    let b = ev.to_display_string(b)?;
    Err(ev.fail(EvalError::AssertionFailed(format!("{a} != {b}"))))
}
