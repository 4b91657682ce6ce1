//! Array builtins, including the higher-order combinators.
//!
//! Callbacks are applied through the evaluator (so they show up in
//! backtraces); results are collected eagerly.

use std::rc::Rc;

use crate::{
    error::{EvalError, EvalResult},
    eval::Evaluator,
    number::Scientific,
    value::{Thunk, Value},
};

pub(super) fn make_array(ev: &mut Evaluator<'_>, size: &Value, func: &Value) -> EvalResult<Value> {
    let size = ev.want_int(size)?;
    if size < 0 {
        return Err(ev.fail(EvalError::StdError(format!(
            "makeArray requires size >= 0, got {size}"
        ))));
    }
    let mut out = Vec::with_capacity(size as usize);
    for index in 0..size {
        let value = ev.call_value(func, &[Value::Num(Scientific::from_i64(index))])?;
        out.push(Thunk::forced(value));
    }
    Ok(Value::Arr(Rc::new(out)))
}

pub(super) fn member(ev: &mut Evaluator<'_>, arr: &Value, needle: &Value) -> EvalResult<Value> {
    let items = ev.want_arr(arr)?.clone();
    for item in items.iter() {
        let item = ev.force(item)?;
        if ev.equals(&item, needle)? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

pub(super) fn count(ev: &mut Evaluator<'_>, arr: &Value, needle: &Value) -> EvalResult<Value> {
    let items = ev.want_arr(arr)?.clone();
    let mut count = 0;
    for item in items.iter() {
        let item = ev.force(item)?;
        if ev.equals(&item, needle)? {
            count += 1;
        }
    }
    Ok(Value::Num(Scientific::from_i64(count)))
}

/// Indexes of every element equal to `needle`.
pub(super) fn find(ev: &mut Evaluator<'_>, needle: &Value, arr: &Value) -> EvalResult<Value> {
    let items = ev.want_arr(arr)?.clone();
    let mut out = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let item = ev.force(item)?;
        if ev.equals(&item, needle)? {
            out.push(Thunk::forced(Value::Num(Scientific::from_i64(index as i64))));
        }
    }
    Ok(Value::Arr(Rc::new(out)))
}

pub(super) fn map(ev: &mut Evaluator<'_>, func: &Value, arr: &Value) -> EvalResult<Value> {
    let items = ev.want_arr(arr)?.clone();
    let mut out = Vec::with_capacity(items.len());
    for item in items.iter() {
        let item = ev.force(item)?;
        out.push(Thunk::forced(ev.call_value(func, &[item])?));
    }
    Ok(Value::Arr(Rc::new(out)))
}

pub(super) fn map_with_index(
    ev: &mut Evaluator<'_>,
    func: &Value,
    arr: &Value,
) -> EvalResult<Value> {
    let items = ev.want_arr(arr)?.clone();
    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let item = ev.force(item)?;
        let index = Value::Num(Scientific::from_i64(index as i64));
        out.push(Thunk::forced(ev.call_value(func, &[index, item])?));
    }
    Ok(Value::Arr(Rc::new(out)))
}

pub(super) fn filter(ev: &mut Evaluator<'_>, func: &Value, arr: &Value) -> EvalResult<Value> {
    let items = ev.want_arr(arr)?.clone();
    let mut out = Vec::new();
    for item in items.iter() {
        let value = ev.force(item)?;
        let keep = ev.call_value(func, &[value])?;
        if ev.want_bool(&keep)? {
            out.push(item.clone());
        }
    }
    Ok(Value::Arr(Rc::new(out)))
}

pub(super) fn filter_map(
    ev: &mut Evaluator<'_>,
    filter_func: &Value,
    map_func: &Value,
    arr: &Value,
) -> EvalResult<Value> {
    let items = ev.want_arr(arr)?.clone();
    let mut out = Vec::new();
    for item in items.iter() {
        let value = ev.force(item)?;
        let keep = ev.call_value(filter_func, &[value.clone()])?;
        if ev.want_bool(&keep)? {
            out.push(Thunk::forced(ev.call_value(map_func, &[value])?));
        }
    }
    Ok(Value::Arr(Rc::new(out)))
}

/// Each callback result must itself be an array; results concatenate.
pub(super) fn flat_map(ev: &mut Evaluator<'_>, func: &Value, arr: &Value) -> EvalResult<Value> {
    let items = ev.want_arr(arr)?.clone();
    let mut out = Vec::new();
    for item in items.iter() {
        let value = ev.force(item)?;
        let chunk = ev.call_value(func, &[value])?;
        out.extend(ev.want_arr(&chunk)?.iter().cloned());
    }
    Ok(Value::Arr(Rc::new(out)))
}

pub(super) fn foldl(
    ev: &mut Evaluator<'_>,
    func: &Value,
    arr: &Value,
    init: &Value,
) -> EvalResult<Value> {
    let items = ev.want_arr(arr)?.clone();
    let mut acc = init.clone();
    for item in items.iter() {
        let item = ev.force(item)?;
        acc = ev.call_value(func, &[acc, item])?;
    }
    Ok(acc)
}

pub(super) fn foldr(
    ev: &mut Evaluator<'_>,
    func: &Value,
    arr: &Value,
    init: &Value,
) -> EvalResult<Value> {
    let items = ev.want_arr(arr)?.clone();
    let mut acc = init.clone();
    for item in items.iter().rev() {
        let item = ev.force(item)?;
        acc = ev.call_value(func, &[item, acc])?;
    }
    Ok(acc)
}

/// `std.range(from, to)`: both ends inclusive; empty when `from > to`.
pub(super) fn range(ev: &mut Evaluator<'_>, from: &Value, to: &Value) -> EvalResult<Value> {
    let from = ev.want_int(from)?;
    let to = ev.want_int(to)?;
    let mut out = Vec::new();
    let mut current = from;
    while current <= to {
        out.push(Thunk::forced(Value::Num(Scientific::from_i64(current))));
        current += 1;
    }
    Ok(Value::Arr(Rc::new(out)))
}

pub(super) fn repeat(ev: &mut Evaluator<'_>, what: &Value, count: &Value) -> EvalResult<Value> {
    let count = ev.want_int(count)?;
    if count < 0 {
        return Err(ev.fail(EvalError::StdError(format!(
            "repeat requires count >= 0, got {count}"
        ))));
    }
    match what {
        Value::Str(s) => Ok(Value::Str(s.repeat(count as usize).into())),
        Value::Arr(items) => {
            let mut out = Vec::with_capacity(items.len() * count as usize);
            for _ in 0..count {
                out.extend(items.iter().cloned());
            }
            Ok(Value::Arr(Rc::new(out)))
        }
        other => Err(ev.type_mismatch("a string or an array", other)),
    }
}

pub(super) fn reverse(ev: &mut Evaluator<'_>, arr: &Value) -> EvalResult<Value> {
    let items = ev.want_arr(arr)?;
    let mut out: Vec<Thunk> = items.iter().cloned().collect();
    out.reverse();
    Ok(Value::Arr(Rc::new(out)))
}

pub(super) fn flatten_arrays(ev: &mut Evaluator<'_>, arrs: &Value) -> EvalResult<Value> {
    let items = ev.want_arr(arrs)?.clone();
    let mut out = Vec::new();
    for item in items.iter() {
        let item = ev.force(item)?;
        out.extend(ev.want_arr(&item)?.iter().cloned());
    }
    Ok(Value::Arr(Rc::new(out)))
}

/// `std.slice(indexable, index, end, step)` over arrays and strings.
///
/// `null` components default to the whole range with step one. Slice
/// expressions desugar to this function.
pub(super) fn slice(
    ev: &mut Evaluator<'_>,
    indexable: &Value,
    index: &Value,
    end: &Value,
    step: &Value,
) -> EvalResult<Value> {
    let index = optional_int(ev, index)?.unwrap_or(0);
    let end = optional_int(ev, end)?;
    let step = optional_int(ev, step)?.unwrap_or(1);
    if index < 0 || end.is_some_and(|end| end < 0) || step < 0 {
        return Err(ev.fail(EvalError::StdError(format!(
            "got [{index}:{}:{step}] but negative index, end, and steps are not supported",
            end.map_or_else(|| "null".to_owned(), |end| end.to_string())
        ))));
    }
    if step == 0 {
        return Err(ev.fail(EvalError::StdError("slice step must not be zero".to_owned())));
    }
    let keep = |position: usize| {
        let position = position as i64;
        position >= index
            && end.is_none_or(|end| position < end)
            && (position - index) % step == 0
    };
    match indexable {
        Value::Str(s) => {
            let out: String = s
                .chars()
                .enumerate()
                .filter(|(position, _)| keep(*position))
                .map(|(_, c)| c)
                .collect();
            Ok(Value::Str(out.into()))
        }
        Value::Arr(items) => {
            let out: Vec<Thunk> = items
                .iter()
                .enumerate()
                .filter(|(position, _)| keep(*position))
                .map(|(_, thunk)| thunk.clone())
                .collect();
            Ok(Value::Arr(Rc::new(out)))
        }
        other => Err(ev.type_mismatch("a string or an array", other)),
    }
}

fn optional_int(ev: &mut Evaluator<'_>, value: &Value) -> EvalResult<Option<i64>> {
    match value {
        Value::Null => Ok(None),
        other => ev.want_int(other).map(Some),
    }
}
