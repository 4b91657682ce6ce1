//! String builtins. Indexing and lengths are in characters, not bytes.

use std::rc::Rc;

use num_bigint::BigInt;

use crate::{
    error::{EvalError, EvalResult},
    eval::Evaluator,
    number::Scientific,
    value::{Thunk, Value},
};

pub(super) fn codepoint(ev: &mut Evaluator<'_>, value: &Value) -> EvalResult<Value> {
    let s = ev.want_str(value)?;
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Value::Num(Scientific::from_i64(i64::from(c as u32)))),
        _ => Err(ev.fail(EvalError::StdError(
            "codepoint takes a single-character string".to_owned(),
        ))),
    }
}

pub(super) fn char_of(ev: &mut Evaluator<'_>, value: &Value) -> EvalResult<Value> {
    let n = ev.want_int(value)?;
    let c = u32::try_from(n)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| {
            ev.fail(EvalError::StdError(format!("invalid unicode codepoint: {n}")))
        })?;
    Ok(Value::Str(c.to_string().into()))
}

pub(super) fn substr(
    ev: &mut Evaluator<'_>,
    value: &Value,
    from: &Value,
    len: &Value,
) -> EvalResult<Value> {
    let s = ev.want_str(value)?;
    let from = ev.want_int(from)?;
    let len = ev.want_int(len)?;
    if from < 0 || len < 0 {
        return Err(ev.fail(EvalError::StdError(
            "substr does not take negative offsets".to_owned(),
        )));
    }
    let out: String = s.chars().skip(from as usize).take(len as usize).collect();
    Ok(Value::Str(out.into()))
}

pub(super) fn starts_with(ev: &mut Evaluator<'_>, a: &Value, b: &Value) -> EvalResult<Value> {
    let (a, b) = (ev.want_str(a)?, ev.want_str(b)?);
    Ok(Value::Bool(a.starts_with(b.as_ref())))
}

pub(super) fn ends_with(ev: &mut Evaluator<'_>, a: &Value, b: &Value) -> EvalResult<Value> {
    let (a, b) = (ev.want_str(a)?, ev.want_str(b)?);
    Ok(Value::Bool(a.ends_with(b.as_ref())))
}

pub(super) fn strip_chars(
    ev: &mut Evaluator<'_>,
    value: &Value,
    chars: &Value,
    left: bool,
    right: bool,
) -> EvalResult<Value> {
    let s = ev.want_str(value)?;
    let chars = ev.want_str(chars)?;
    let matches = |c: char| chars.contains(c);
    let out = match (left, right) {
        (true, true) => s.trim_matches(matches),
        (true, false) => s.trim_start_matches(matches),
        _ => s.trim_end_matches(matches),
    };
    Ok(Value::Str(out.into()))
}

pub(super) fn split(ev: &mut Evaluator<'_>, value: &Value, sep: &Value) -> EvalResult<Value> {
    let s = ev.want_str(value)?;
    let sep = ev.want_str(sep)?;
    if sep.is_empty() {
        return Err(ev.fail(EvalError::StdError(
            "split separator must not be empty".to_owned(),
        )));
    }
    let parts: Vec<Thunk> = s
        .split(sep.as_ref())
        .map(|part| Thunk::forced(Value::Str(part.into())))
        .collect();
    Ok(Value::Arr(Rc::new(parts)))
}

pub(super) fn str_replace(
    ev: &mut Evaluator<'_>,
    value: &Value,
    from: &Value,
    to: &Value,
) -> EvalResult<Value> {
    let s = ev.want_str(value)?;
    let from = ev.want_str(from)?;
    let to = ev.want_str(to)?;
    if from.is_empty() {
        return Err(ev.fail(EvalError::StdError(
            "strReplace pattern must not be empty".to_owned(),
        )));
    }
    Ok(Value::Str(s.replace(from.as_ref(), to).into()))
}

pub(super) fn ascii_case(ev: &mut Evaluator<'_>, value: &Value, upper: bool) -> EvalResult<Value> {
    let s = ev.want_str(value)?;
    let out = if upper {
        s.to_ascii_uppercase()
    } else {
        s.to_ascii_lowercase()
    };
    Ok(Value::Str(out.into()))
}

pub(super) fn string_chars(ev: &mut Evaluator<'_>, value: &Value) -> EvalResult<Value> {
    let s = ev.want_str(value)?;
    let chars: Vec<Thunk> = s
        .chars()
        .map(|c| Thunk::forced(Value::Str(c.to_string().into())))
        .collect();
    Ok(Value::Arr(Rc::new(chars)))
}

pub(super) fn parse_int(ev: &mut Evaluator<'_>, value: &Value) -> EvalResult<Value> {
    let s = ev.want_str(value)?;
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.as_ref()),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ev.fail(EvalError::StdError(format!(
            "expected a base 10 integer, got \"{s}\""
        ))));
    }
    let mut n = BigInt::parse_bytes(digits.as_bytes(), 10)
        .ok_or_else(|| ev.fail(EvalError::StdError(format!("expected a base 10 integer, got \"{s}\""))))?;
    if negative {
        n = -n;
    }
    Ok(Value::Num(Scientific::new(n, 0)))
}

pub(super) fn parse_radix(
    ev: &mut Evaluator<'_>,
    value: &Value,
    radix: u32,
    what: &str,
) -> EvalResult<Value> {
    let s = ev.want_str(value)?;
    if s.is_empty() {
        return Err(ev.fail(EvalError::StdError(format!(
            "expected a {what} string, got \"\""
        ))));
    }
    let n = BigInt::parse_bytes(s.as_bytes(), radix).ok_or_else(|| {
        ev.fail(EvalError::StdError(format!(
            "expected a {what} string, got \"{s}\""
        )))
    })?;
    Ok(Value::Num(Scientific::new(n, 0)))
}

/// `std.lines`: concatenates an array of strings, terminating each with a
/// newline.
pub(super) fn lines(ev: &mut Evaluator<'_>, value: &Value) -> EvalResult<Value> {
    let items = ev.want_arr(value)?.clone();
    let mut out = String::new();
    for item in items.iter() {
        let item = ev.force(item)?;
        out.push_str(ev.want_str(&item)?);
        out.push('\n');
    }
    Ok(Value::Str(out.into()))
}

/// `std.join`: string or array separator; `null` elements are skipped.
pub(super) fn join(ev: &mut Evaluator<'_>, sep: &Value, arr: &Value) -> EvalResult<Value> {
    let items = ev.want_arr(arr)?.clone();
    match sep {
        Value::Str(sep) => {
            let mut out = String::new();
            let mut first = true;
            for item in items.iter() {
                let item = ev.force(item)?;
                if matches!(item, Value::Null) {
                    continue;
                }
                if !first {
                    out.push_str(sep);
                }
                first = false;
                out.push_str(ev.want_str(&item)?);
            }
            Ok(Value::Str(out.into()))
        }
        Value::Arr(sep) => {
            let mut out: Vec<Thunk> = Vec::new();
            let mut first = true;
            for item in items.iter() {
                let item = ev.force(item)?;
                if matches!(item, Value::Null) {
                    continue;
                }
                if !first {
                    out.extend(sep.iter().cloned());
                }
                first = false;
                out.extend(ev.want_arr(&item)?.iter().cloned());
            }
            Ok(Value::Arr(Rc::new(out)))
        }
        other => Err(ev.type_mismatch("a string or an array", other)),
    }
}
