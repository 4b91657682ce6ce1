//! Byte-level codecs and the manifestation builtins.

use std::rc::Rc;

use crate::{
    error::{EvalError, EvalResult},
    eval::Evaluator,
    manifest,
    number::Scientific,
    value::{Thunk, Value},
};

/// `std.encodeUTF8`: a string as an array of byte values.
pub(super) fn encode_utf8(ev: &mut Evaluator<'_>, value: &Value) -> EvalResult<Value> {
    let s = ev.want_str(value)?;
    let bytes: Vec<Thunk> = s
        .bytes()
        .map(|b| Thunk::forced(Value::Num(Scientific::from_i64(i64::from(b)))))
        .collect();
    Ok(Value::Arr(Rc::new(bytes)))
}

/// `std.decodeUTF8`: an array of byte values back into a string.
pub(super) fn decode_utf8(ev: &mut Evaluator<'_>, value: &Value) -> EvalResult<Value> {
    let items = ev.want_arr(value)?.clone();
    let mut bytes = Vec::with_capacity(items.len());
    for item in items.iter() {
        let item = ev.force(item)?;
        let byte = ev.want_int(&item)?;
        let byte = u8::try_from(byte).map_err(|_| {
            ev.fail(EvalError::StdError(format!(
                "decodeUTF8 expects byte values in [0, 255], got {byte}"
            )))
        })?;
        bytes.push(byte);
    }
    let out = String::from_utf8(bytes)
        .map_err(|_| ev.fail(EvalError::StdError("decodeUTF8 got invalid UTF-8".to_owned())))?;
    Ok(Value::Str(out.into()))
}

pub(super) fn manifest_json_ex(
    ev: &mut Evaluator<'_>,
    value: &Value,
    indent: &Value,
) -> EvalResult<Value> {
    let indent = ev.want_str(indent)?.clone();
    let json = manifest::manifest(ev, value)?;
    let rendered = if indent.is_empty() {
        manifest::render_compact(&json)
    } else {
        manifest::render_pretty(&json, &indent)
    };
    Ok(Value::Str(rendered.into()))
}

pub(super) fn manifest_yaml_doc(ev: &mut Evaluator<'_>, value: &Value) -> EvalResult<Value> {
    let json = manifest::manifest(ev, value)?;
    Ok(Value::Str(manifest::render_yaml(&json).into()))
}
