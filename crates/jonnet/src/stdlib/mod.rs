//! The standard library: host primitives exposed as the hidden fields of
//! the `std` object bound in the initial environment.
//!
//! Each builtin declares its parameter names (used to bind named arguments)
//! and receives its arguments fully forced. Implementations live in
//! submodules grouped by the kind of value they operate on.

mod arrays;
mod encode;
mod numbers;
mod objects;
mod strings;

use std::rc::Rc;

use indexmap::IndexMap;
use strum::{Display, EnumIter, IntoEnumIterator};

use crate::{
    ast::Visibility,
    error::{EvalError, EvalResult},
    eval::Evaluator,
    value::{FuncImpl, FuncVal, ObjField, ObjValue, Thunk, Value},
};

/// Every standard-library function.
///
/// The strum `Display` derive yields the Jsonnet-visible name
/// (`ObjectFields` -> `objectFields`); the UTF-8 codecs keep their
/// conventional capitalization through explicit overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "camelCase")]
pub(crate) enum StdFn {
    // type predicates
    IsString,
    IsBoolean,
    IsNumber,
    IsObject,
    IsArray,
    IsFunction,
    Type,
    // equality
    Equals,
    AssertEqual,
    // object introspection
    ObjectFields,
    ObjectHas,
    ObjectHasEx,
    ObjectHasAll,
    Length,
    // arithmetic
    Abs,
    Sign,
    Max,
    Min,
    Pow,
    Exp,
    Log,
    Exponent,
    Mantissa,
    Floor,
    Ceil,
    Sqrt,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Mod,
    // strings
    ToString,
    Codepoint,
    Char,
    Substr,
    StartsWith,
    EndsWith,
    StripChars,
    LstripChars,
    RstripChars,
    Split,
    StrReplace,
    AsciiLower,
    AsciiUpper,
    StringChars,
    ParseInt,
    ParseOctal,
    ParseHex,
    #[strum(serialize = "encodeUTF8")]
    EncodeUtf8,
    #[strum(serialize = "decodeUTF8")]
    DecodeUtf8,
    Lines,
    Join,
    // arrays
    MakeArray,
    Member,
    Count,
    Find,
    Map,
    MapWithIndex,
    FilterMap,
    FlatMap,
    Filter,
    Foldl,
    Foldr,
    Range,
    Repeat,
    Reverse,
    Slice,
    FlattenArrays,
    // manifestation
    ManifestYamlDoc,
    ManifestJsonEx,
    // diagnostics
    Trace,
}

impl StdFn {
    /// Parameter names, used to bind call-site arguments (named arguments
    /// included) before the builtin runs.
    pub(crate) fn param_names(self) -> &'static [&'static str] {
        match self {
            Self::IsString
            | Self::IsBoolean
            | Self::IsNumber
            | Self::IsObject
            | Self::IsArray
            | Self::IsFunction
            | Self::Type
            | Self::Length => &["x"],
            Self::Equals | Self::AssertEqual => &["a", "b"],
            Self::ObjectFields => &["o"],
            Self::ObjectHas | Self::ObjectHasAll => &["o", "f"],
            Self::ObjectHasEx => &["o", "f", "hidden"],
            Self::Abs | Self::Sign => &["n"],
            Self::Max | Self::Min => &["a", "b"],
            Self::Pow => &["x", "n"],
            Self::Exp
            | Self::Log
            | Self::Exponent
            | Self::Mantissa
            | Self::Floor
            | Self::Ceil
            | Self::Sqrt
            | Self::Sin
            | Self::Cos
            | Self::Tan
            | Self::Asin
            | Self::Acos
            | Self::Atan => &["x"],
            Self::Mod => &["a", "b"],
            Self::ToString => &["a"],
            Self::Codepoint => &["str"],
            Self::Char => &["n"],
            Self::Substr => &["str", "from", "len"],
            Self::StartsWith | Self::EndsWith => &["a", "b"],
            Self::StripChars | Self::LstripChars | Self::RstripChars => &["str", "chars"],
            Self::Split => &["str", "c"],
            Self::StrReplace => &["str", "from", "to"],
            Self::AsciiLower | Self::AsciiUpper | Self::StringChars => &["str"],
            Self::ParseInt | Self::ParseOctal | Self::ParseHex => &["str"],
            Self::EncodeUtf8 => &["str"],
            Self::DecodeUtf8 => &["arr"],
            Self::Lines => &["arr"],
            Self::Join => &["sep", "arr"],
            Self::MakeArray => &["sz", "func"],
            Self::Member => &["arr", "x"],
            Self::Count => &["arr", "x"],
            Self::Find => &["value", "arr"],
            Self::Map | Self::MapWithIndex | Self::FlatMap | Self::Filter => &["func", "arr"],
            Self::FilterMap => &["filter_func", "map_func", "arr"],
            Self::Foldl | Self::Foldr => &["func", "arr", "init"],
            Self::Range => &["from", "to"],
            Self::Repeat => &["what", "count"],
            Self::Reverse => &["arr"],
            Self::Slice => &["indexable", "index", "end", "step"],
            Self::FlattenArrays => &["arrs"],
            Self::ManifestYamlDoc => &["value"],
            Self::ManifestJsonEx => &["value", "indent"],
            Self::Trace => &["str", "rest"],
        }
    }
}

/// Builds the `std` object: one hidden field per builtin.
///
/// Embedders can extend the result with [`ObjValue::with_field`] (native
/// functions, constants) before handing it to the runner.
#[must_use]
pub fn std_object() -> Value {
    let mut fields: IndexMap<Rc<str>, ObjField> = IndexMap::new();
    for func in StdFn::iter() {
        fields.insert(
            func.to_string().into(),
            ObjField {
                visibility: Visibility::Hidden,
                bind: None,
                thunk: Thunk::forced(Value::Func(Rc::new(FuncVal(FuncImpl::Builtin(func))))),
            },
        );
    }
    Value::Obj(ObjValue::new(fields, Vec::new()))
}

/// Dispatches a builtin call. `args` holds exactly one forced value per
/// declared parameter.
pub(crate) fn call(ev: &mut Evaluator<'_>, func: StdFn, args: &[Value]) -> EvalResult<Value> {
    match func {
        StdFn::IsString => Ok(Value::Bool(matches!(args[0], Value::Str(_)))),
        StdFn::IsBoolean => Ok(Value::Bool(matches!(args[0], Value::Bool(_)))),
        StdFn::IsNumber => Ok(Value::Bool(matches!(args[0], Value::Num(_)))),
        StdFn::IsObject => Ok(Value::Bool(matches!(args[0], Value::Obj(_)))),
        StdFn::IsArray => Ok(Value::Bool(matches!(args[0], Value::Arr(_)))),
        StdFn::IsFunction => Ok(Value::Bool(matches!(args[0], Value::Func(_)))),
        StdFn::Type => Ok(Value::Str(args[0].kind_name().into())),

        StdFn::Equals => ev.equals(&args[0], &args[1]).map(Value::Bool),
        StdFn::AssertEqual => objects::assert_equal(ev, &args[0], &args[1]),

        StdFn::ObjectFields => objects::object_fields(ev, &args[0]),
        StdFn::ObjectHas => objects::object_has(ev, &args[0], &args[1], false),
        StdFn::ObjectHasAll => objects::object_has(ev, &args[0], &args[1], true),
        StdFn::ObjectHasEx => {
            let include_hidden = ev.want_bool(&args[2])?;
            objects::object_has(ev, &args[0], &args[1], include_hidden)
        }
        StdFn::Length => length(ev, &args[0]),

        StdFn::Abs => numbers::abs(ev, &args[0]),
        StdFn::Sign => numbers::sign(ev, &args[0]),
        StdFn::Max => numbers::max(ev, &args[0], &args[1]),
        StdFn::Min => numbers::min(ev, &args[0], &args[1]),
        StdFn::Pow => numbers::pow(ev, &args[0], &args[1]),
        StdFn::Exp => numbers::unary_f64(ev, &args[0], f64::exp),
        StdFn::Log => numbers::unary_f64(ev, &args[0], f64::ln),
        StdFn::Exponent => numbers::exponent(ev, &args[0]),
        StdFn::Mantissa => numbers::mantissa(ev, &args[0]),
        StdFn::Floor => numbers::floor(ev, &args[0]),
        StdFn::Ceil => numbers::ceil(ev, &args[0]),
        StdFn::Sqrt => numbers::unary_f64(ev, &args[0], f64::sqrt),
        StdFn::Sin => numbers::unary_f64(ev, &args[0], f64::sin),
        StdFn::Cos => numbers::unary_f64(ev, &args[0], f64::cos),
        StdFn::Tan => numbers::unary_f64(ev, &args[0], f64::tan),
        StdFn::Asin => numbers::unary_f64(ev, &args[0], f64::asin),
        StdFn::Acos => numbers::unary_f64(ev, &args[0], f64::acos),
        StdFn::Atan => numbers::unary_f64(ev, &args[0], f64::atan),
        StdFn::Mod => numbers::modulo(ev, &args[0], &args[1]),

        StdFn::ToString => {
            let rendered = ev.to_display_string(&args[0])?;
            Ok(Value::Str(rendered.into()))
        }
        StdFn::Codepoint => strings::codepoint(ev, &args[0]),
        StdFn::Char => strings::char_of(ev, &args[0]),
        StdFn::Substr => strings::substr(ev, &args[0], &args[1], &args[2]),
        StdFn::StartsWith => strings::starts_with(ev, &args[0], &args[1]),
        StdFn::EndsWith => strings::ends_with(ev, &args[0], &args[1]),
        StdFn::StripChars => strings::strip_chars(ev, &args[0], &args[1], true, true),
        StdFn::LstripChars => strings::strip_chars(ev, &args[0], &args[1], true, false),
        StdFn::RstripChars => strings::strip_chars(ev, &args[0], &args[1], false, true),
        StdFn::Split => strings::split(ev, &args[0], &args[1]),
        StdFn::StrReplace => strings::str_replace(ev, &args[0], &args[1], &args[2]),
        StdFn::AsciiLower => strings::ascii_case(ev, &args[0], false),
        StdFn::AsciiUpper => strings::ascii_case(ev, &args[0], true),
        StdFn::StringChars => strings::string_chars(ev, &args[0]),
        StdFn::ParseInt => strings::parse_int(ev, &args[0]),
        StdFn::ParseOctal => strings::parse_radix(ev, &args[0], 8, "octal"),
        StdFn::ParseHex => strings::parse_radix(ev, &args[0], 16, "hex"),
        StdFn::EncodeUtf8 => encode::encode_utf8(ev, &args[0]),
        StdFn::DecodeUtf8 => encode::decode_utf8(ev, &args[0]),
        StdFn::Lines => strings::lines(ev, &args[0]),
        StdFn::Join => strings::join(ev, &args[0], &args[1]),

        StdFn::MakeArray => arrays::make_array(ev, &args[0], &args[1]),
        StdFn::Member => arrays::member(ev, &args[0], &args[1]),
        StdFn::Count => arrays::count(ev, &args[0], &args[1]),
        StdFn::Find => arrays::find(ev, &args[0], &args[1]),
        StdFn::Map => arrays::map(ev, &args[0], &args[1]),
        StdFn::MapWithIndex => arrays::map_with_index(ev, &args[0], &args[1]),
        StdFn::FilterMap => arrays::filter_map(ev, &args[0], &args[1], &args[2]),
        StdFn::FlatMap => arrays::flat_map(ev, &args[0], &args[1]),
        StdFn::Filter => arrays::filter(ev, &args[0], &args[1]),
        StdFn::Foldl => arrays::foldl(ev, &args[0], &args[1], &args[2]),
        StdFn::Foldr => arrays::foldr(ev, &args[0], &args[1], &args[2]),
        StdFn::Range => arrays::range(ev, &args[0], &args[1]),
        StdFn::Repeat => arrays::repeat(ev, &args[0], &args[1]),
        StdFn::Reverse => arrays::reverse(ev, &args[0]),
        StdFn::Slice => arrays::slice(ev, &args[0], &args[1], &args[2], &args[3]),
        StdFn::FlattenArrays => arrays::flatten_arrays(ev, &args[0]),

        StdFn::ManifestYamlDoc => encode::manifest_yaml_doc(ev, &args[0]),
        StdFn::ManifestJsonEx => encode::manifest_json_ex(ev, &args[0], &args[1]),

        StdFn::Trace => {
            let message = ev.want_str(&args[0])?.clone();
            ev.emit_trace(&message);
            Ok(args[1].clone())
        }
    }
}

/// `std.length` over strings (characters), arrays and objects (visible
/// fields).
fn length(ev: &mut Evaluator<'_>, value: &Value) -> EvalResult<Value> {
    let len = match value {
        Value::Str(s) => s.chars().count(),
        Value::Arr(items) => items.len(),
        Value::Obj(obj) => {
            ev.run_asserts(obj)?;
            obj.visible_count()
        }
        other => {
            return Err(ev.fail(EvalError::TypeMismatch {
                expected: "a string, an array or an object".to_owned(),
                actual: crate::eval::described(other),
            }));
        }
    };
    Ok(Value::Num(crate::number::Scientific::from_i64(len as i64)))
}
