//! Manifestation: forcing the lazy value graph into pure JSON.

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::{
    error::{EvalError, EvalResult},
    eval::Evaluator,
    value::Value,
};

/// Forces a value into a JSON tree.
///
/// Object assertions run first; hidden fields are dropped without being
/// forced; remaining keys are sorted lexicographically. Numbers carry their
/// exact decimal rendering (`serde_json`'s arbitrary-precision
/// representation), so manifestation never rounds.
pub(crate) fn manifest(ev: &mut Evaluator, value: &Value) -> EvalResult<serde_json::Value> {
    match value {
        Value::Null => Ok(serde_json::Value::Null),
        Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
        Value::Num(n) => Ok(serde_json::Value::Number(
            serde_json::Number::from_string_unchecked(n.render()),
        )),
        Value::Str(s) => Ok(serde_json::Value::String(s.to_string())),
        Value::Arr(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items.iter() {
                let item = ev.force(item)?;
                out.push(manifest(ev, &item)?);
            }
            Ok(serde_json::Value::Array(out))
        }
        Value::Obj(obj) => {
            ev.run_asserts(obj)?;
            let mut entries: Vec<_> = obj
                .entries()
                .into_iter()
                .filter(|(_, field)| field.is_visible())
                .collect();
            entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
            let mut map = serde_json::Map::with_capacity(entries.len());
            for (name, field) in entries {
                let value = ev.force(&field.thunk)?;
                map.insert(name.to_string(), manifest(ev, &value)?);
            }
            Ok(serde_json::Value::Object(map))
        }
        Value::Func(_) => Err(ev.fail(EvalError::ManifestError(
            "cannot manifest a function".to_owned(),
        ))),
    }
}

/// Compact JSON rendering, used by `toString`, string coercion and error
/// messages.
pub(crate) fn render_compact(json: &serde_json::Value) -> String {
    serde_json::to_string(json).expect("a manifested JSON tree always serializes")
}

/// JSON rendering with a caller-chosen indentation unit (`manifestJsonEx`).
pub(crate) fn render_pretty(json: &serde_json::Value, indent: &str) -> String {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = Serializer::with_formatter(&mut out, formatter);
    json.serialize(&mut serializer)
        .expect("a manifested JSON tree always serializes");
    String::from_utf8(out).expect("serde_json emits UTF-8")
}

/// Single-document YAML rendering (`manifestYamlDoc`).
///
/// Scalars and empty containers render as JSON (keys stay quoted); arrays
/// use block sequences and objects block mappings, indented by two spaces.
pub(crate) fn render_yaml(json: &serde_json::Value) -> String {
    let mut out = String::new();
    if is_scalar(json) {
        out.push_str(&render_compact(json));
    } else {
        yaml_block(json, 0, &mut out);
        while out.ends_with('\n') {
            out.pop();
        }
    }
    out
}

fn is_scalar(json: &serde_json::Value) -> bool {
    match json {
        serde_json::Value::Array(items) => items.is_empty(),
        serde_json::Value::Object(map) => map.is_empty(),
        _ => true,
    }
}

fn yaml_block(json: &serde_json::Value, indent: usize, out: &mut String) {
    match json {
        serde_json::Value::Array(items) => {
            for item in items {
                push_indent(indent, out);
                if is_scalar(item) {
                    out.push_str("- ");
                    out.push_str(&render_compact(item));
                    out.push('\n');
                } else {
                    out.push_str("-\n");
                    yaml_block(item, indent + 2, out);
                }
            }
        }
        serde_json::Value::Object(map) => {
            for (key, value) in map {
                push_indent(indent, out);
                out.push_str(&render_compact(&serde_json::Value::String(key.clone())));
                out.push(':');
                if is_scalar(value) {
                    out.push(' ');
                    out.push_str(&render_compact(value));
                    out.push('\n');
                } else {
                    out.push('\n');
                    yaml_block(value, indent + 2, out);
                }
            }
        }
        scalar => {
            push_indent(indent, out);
            out.push_str(&render_compact(scalar));
            out.push('\n');
        }
    }
}

fn push_indent(indent: usize, out: &mut String) {
    for _ in 0..indent {
        out.push(' ');
    }
}
