//! Arithmetic builtins.
//!
//! `abs`, `sign`, `floor`, `ceil`, `max` and `min` are exact on decimals;
//! everything else rounds through IEEE-754 doubles, which is the documented
//! contract for the transcendental functions.

use crate::{
    error::{EvalError, EvalResult},
    eval::Evaluator,
    number::Scientific,
    value::Value,
};

pub(super) fn abs(ev: &mut Evaluator<'_>, value: &Value) -> EvalResult<Value> {
    let n = ev.want_num(value)?;
    Ok(Value::Num(n.abs()))
}

pub(super) fn sign(ev: &mut Evaluator<'_>, value: &Value) -> EvalResult<Value> {
    let n = ev.want_num(value)?;
    Ok(Value::Num(Scientific::from_i64(n.signum())))
}

pub(super) fn max(ev: &mut Evaluator<'_>, a: &Value, b: &Value) -> EvalResult<Value> {
    let (a, b) = (ev.want_num(a)?, ev.want_num(b)?);
    Ok(Value::Num(if a >= b { a.clone() } else { b.clone() }))
}

pub(super) fn min(ev: &mut Evaluator<'_>, a: &Value, b: &Value) -> EvalResult<Value> {
    let (a, b) = (ev.want_num(a)?, ev.want_num(b)?);
    Ok(Value::Num(if a <= b { a.clone() } else { b.clone() }))
}

pub(super) fn floor(ev: &mut Evaluator<'_>, value: &Value) -> EvalResult<Value> {
    let n = ev.want_num(value)?;
    Ok(Value::Num(n.floor()))
}

pub(super) fn ceil(ev: &mut Evaluator<'_>, value: &Value) -> EvalResult<Value> {
    let n = ev.want_num(value)?;
    Ok(Value::Num(n.ceil()))
}

pub(super) fn pow(ev: &mut Evaluator<'_>, base: &Value, exponent: &Value) -> EvalResult<Value> {
    let (base, exponent) = (ev.want_num(base)?, ev.want_num(exponent)?);
    from_f64(ev, base.to_f64().powf(exponent.to_f64()))
}

/// Applies a double-valued function to a number argument.
pub(super) fn unary_f64(
    ev: &mut Evaluator<'_>,
    value: &Value,
    f: fn(f64) -> f64,
) -> EvalResult<Value> {
    let n = ev.want_num(value)?;
    from_f64(ev, f(n.to_f64()))
}

/// `std.mod`: the `%` operator as a function.
pub(super) fn modulo(ev: &mut Evaluator<'_>, a: &Value, b: &Value) -> EvalResult<Value> {
    let (a, b) = (ev.want_num(a)?, ev.want_num(b)?);
    if b.is_zero() {
        return Err(ev.fail(EvalError::DivByZero));
    }
    let remainder = a
        .rem(b)
        .ok_or_else(|| ev.fail(EvalError::RuntimeError("numeric overflow".to_owned())))?;
    Ok(Value::Num(remainder))
}

/// Base-2 exponent: `x = mantissa * 2^exponent` with `0.5 <= |mantissa| < 1`.
pub(super) fn exponent(ev: &mut Evaluator<'_>, value: &Value) -> EvalResult<Value> {
    let n = ev.want_num(value)?;
    let (_, exp) = frexp(n.to_f64());
    Ok(Value::Num(Scientific::from_i64(exp)))
}

/// Base-2 mantissa; see [`exponent`].
pub(super) fn mantissa(ev: &mut Evaluator<'_>, value: &Value) -> EvalResult<Value> {
    let n = ev.want_num(value)?;
    let (mantissa, _) = frexp(n.to_f64());
    from_f64(ev, mantissa)
}

fn frexp(x: f64) -> (f64, i64) {
    if x == 0.0 || !x.is_finite() {
        return (x, 0);
    }
    let mut exp = x.abs().log2().floor() as i64 + 1;
    let mut mantissa = x / 2f64.powi(exp as i32);
    while mantissa.abs() >= 1.0 {
        mantissa /= 2.0;
        exp += 1;
    }
    while mantissa.abs() < 0.5 {
        mantissa *= 2.0;
        exp -= 1;
    }
    (mantissa, exp)
}

fn from_f64(ev: &Evaluator<'_>, value: f64) -> EvalResult<Value> {
    Scientific::from_f64(value)
        .map(Value::Num)
        .ok_or_else(|| ev.fail(EvalError::RuntimeError("not a finite number".to_owned())))
}
