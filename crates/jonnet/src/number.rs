//! Arbitrary-precision decimal numbers.
//!
//! Jsonnet numbers are decimals of the form `mantissa * 10^exponent`. Keeping
//! them exact (rather than collapsing to `f64`) means integer arithmetic and
//! manifestation never lose precision; only division, modulo and the
//! transcendental standard-library functions round through IEEE-754 doubles.

use std::{cmp::Ordering, fmt, ops::Neg};

use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive, Zero};

/// An exact decimal: `mantissa * 10^exponent`.
///
/// Values are kept normalized: the mantissa is never divisible by ten, and
/// zero is represented as mantissa `0` with exponent `0`. Normalization makes
/// structural equality coincide with numeric equality, which the evaluator
/// relies on when comparing manifested JSON.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scientific {
    mantissa: BigInt,
    exponent: i64,
}

impl Scientific {
    /// Creates a number from a raw mantissa/exponent pair, normalizing it.
    #[must_use]
    pub fn new(mantissa: BigInt, exponent: i64) -> Self {
        let mut mantissa = mantissa;
        let mut exponent = exponent;
        if mantissa.is_zero() {
            exponent = 0;
        } else {
            let ten = BigInt::from(10);
            loop {
                let (q, r) = mantissa.div_rem(&ten);
                if !r.is_zero() {
                    break;
                }
                mantissa = q;
                exponent += 1;
            }
        }
        Self { mantissa, exponent }
    }

    #[must_use]
    pub fn from_i64(value: i64) -> Self {
        Self::new(BigInt::from(value), 0)
    }

    #[must_use]
    pub fn zero() -> Self {
        Self {
            mantissa: BigInt::zero(),
            exponent: 0,
        }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    /// True when the value has no fractional part.
    #[must_use]
    pub fn is_integral(&self) -> bool {
        self.exponent >= 0
    }

    /// Sign of the value: -1, 0 or 1.
    #[must_use]
    pub fn signum(&self) -> i64 {
        match self.mantissa.sign() {
            Sign::Minus => -1,
            Sign::NoSign => 0,
            Sign::Plus => 1,
        }
    }

    /// Parses decimal or scientific notation (`42`, `-1.5`, `2.5e-3`).
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let (digits_part, exp10) = match text.split_once(['e', 'E']) {
            Some((digits, exp)) => (digits, exp.parse::<i64>().ok()?),
            None => (text, 0),
        };
        let (negative, digits_part) = match digits_part.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, digits_part.strip_prefix('+').unwrap_or(digits_part)),
        };
        let (int_digits, frac_digits) = match digits_part.split_once('.') {
            Some((int, frac)) => (int, frac),
            None => (digits_part, ""),
        };
        if int_digits.is_empty() && frac_digits.is_empty() {
            return None;
        }
        let mut digits = String::with_capacity(int_digits.len() + frac_digits.len());
        for c in int_digits.chars().chain(frac_digits.chars()) {
            if !c.is_ascii_digit() {
                return None;
            }
            digits.push(c);
        }
        let mut mantissa = BigInt::parse_bytes(digits.as_bytes(), 10)?;
        if negative {
            mantissa = -mantissa;
        }
        Some(Self::new(mantissa, exp10.checked_sub(frac_digits.len() as i64)?))
    }

    /// Converts a double to its exact shortest decimal representation.
    ///
    /// Returns `None` for NaN and infinities, which have no decimal form.
    #[must_use]
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let mut buffer = ryu::Buffer::new();
        Self::parse(buffer.format(value))
    }

    /// Rounds to the nearest double. Values beyond the double range become
    /// infinite, mirroring IEEE-754 overflow.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        format!("{}e{}", self.mantissa, self.exponent)
            .parse::<f64>()
            .unwrap_or(f64::NAN)
    }

    /// The exact integer value, when integral and within `i64` range.
    #[must_use]
    pub fn to_i64(&self) -> Option<i64> {
        if !self.is_integral() {
            return None;
        }
        // i64::MAX has 19 digits; anything shifted further cannot fit.
        if self.exponent > 19 {
            return None;
        }
        let full = &self.mantissa * pow10(self.exponent.unsigned_abs());
        full.to_i64()
    }

    #[must_use]
    pub fn abs(&self) -> Self {
        Self {
            mantissa: self.mantissa.abs(),
            exponent: self.exponent,
        }
    }

    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        let (a, b, exponent) = align(self, other);
        Self::new(a + b, exponent)
    }

    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        let (a, b, exponent) = align(self, other);
        Self::new(a - b, exponent)
    }

    #[must_use]
    pub fn mul(&self, other: &Self) -> Self {
        Self::new(
            &self.mantissa * &other.mantissa,
            self.exponent + other.exponent,
        )
    }

    /// Division through IEEE-754 doubles; exact decimal division does not
    /// terminate in general. Returns `None` when the result is not finite.
    #[must_use]
    pub fn div(&self, other: &Self) -> Option<Self> {
        Self::from_f64(self.to_f64() / other.to_f64())
    }

    /// Remainder with the sign of the dividend, through IEEE-754 doubles.
    #[must_use]
    pub fn rem(&self, other: &Self) -> Option<Self> {
        Self::from_f64(self.to_f64() % other.to_f64())
    }

    #[must_use]
    pub fn floor(&self) -> Self {
        self.round_down(Sign::Minus)
    }

    #[must_use]
    pub fn ceil(&self) -> Self {
        self.round_down(Sign::Plus)
    }

    fn round_down(&self, away: Sign) -> Self {
        if self.exponent >= 0 {
            return self.clone();
        }
        let scale = pow10(self.exponent.unsigned_abs());
        let (quotient, remainder) = self.mantissa.div_rem(&scale);
        if remainder.is_zero() || self.mantissa.sign() != away {
            Self::new(quotient, 0)
        } else if away == Sign::Plus {
            Self::new(quotient + 1, 0)
        } else {
            Self::new(quotient - 1, 0)
        }
    }

    /// Renders the number for output.
    ///
    /// Integers with an exponent in `[0, 1024]` print exactly. Fractions near
    /// one print in plain decimal notation; everything else falls back to
    /// normalized scientific notation.
    #[must_use]
    pub fn render(&self) -> String {
        if self.mantissa.is_zero() {
            return "0".to_owned();
        }
        if (0..=1024).contains(&self.exponent) {
            let mut out = self.mantissa.to_string();
            for _ in 0..self.exponent {
                out.push('0');
            }
            return out;
        }
        let negative = self.mantissa.sign() == Sign::Minus;
        let digits = self.mantissa.magnitude().to_string();
        let adjusted = self.exponent + digits.len() as i64 - 1;
        let mut out = String::new();
        if negative {
            out.push('-');
        }
        if (-5..=20).contains(&adjusted) && self.exponent < 0 {
            let point = digits.len() as i64 + self.exponent;
            if point > 0 {
                let split = usize::try_from(point).unwrap_or(digits.len());
                out.push_str(&digits[..split]);
                out.push('.');
                out.push_str(&digits[split..]);
            } else {
                out.push_str("0.");
                for _ in 0..-point {
                    out.push('0');
                }
                out.push_str(&digits);
            }
        } else {
            out.push_str(&digits[..1]);
            if digits.len() > 1 {
                out.push('.');
                out.push_str(&digits[1..]);
            }
            out.push('e');
            out.push_str(&adjusted.to_string());
        }
        out
    }
}

impl Neg for Scientific {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            mantissa: -self.mantissa,
            exponent: self.exponent,
        }
    }
}

impl PartialOrd for Scientific {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scientific {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.mantissa.sign().cmp(&other.mantissa.sign()) {
            Ordering::Equal => {
                let (a, b, _) = align(self, other);
                a.cmp(&b)
            }
            unequal => unequal,
        }
    }
}

impl fmt::Display for Scientific {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Brings two numbers to a common exponent so mantissas can be combined.
fn align(left: &Scientific, right: &Scientific) -> (BigInt, BigInt, i64) {
    match left.exponent.cmp(&right.exponent) {
        Ordering::Equal => (left.mantissa.clone(), right.mantissa.clone(), left.exponent),
        Ordering::Less => {
            let shift = pow10((right.exponent - left.exponent).unsigned_abs());
            (left.mantissa.clone(), &right.mantissa * shift, left.exponent)
        }
        Ordering::Greater => {
            let shift = pow10((left.exponent - right.exponent).unsigned_abs());
            (&left.mantissa * shift, right.mantissa.clone(), right.exponent)
        }
    }
}

fn pow10(power: u64) -> BigInt {
    num_traits::pow(BigInt::from(10), usize::try_from(power).unwrap_or(usize::MAX))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::Scientific;

    fn s(text: &str) -> Scientific {
        Scientific::parse(text).unwrap()
    }

    #[test]
    fn parse_and_render() {
        assert_eq!(s("42").render(), "42");
        assert_eq!(s("-42").render(), "-42");
        assert_eq!(s("1.5").render(), "1.5");
        assert_eq!(s("0.25").render(), "0.25");
        assert_eq!(s("2.5e-3").render(), "0.0025");
        assert_eq!(s("1e-7").render(), "1e-7");
        assert_eq!(s("1.5e-10").render(), "1.5e-10");
        assert_eq!(s("1e2000").render(), "1e2000");
        assert_eq!(s("0").render(), "0");
        assert_eq!(s("10.0").render(), "10");
    }

    #[test]
    fn exact_arithmetic() {
        assert_eq!(s("0.1").add(&s("0.2")), s("0.3"));
        assert_eq!(s("1").sub(&s("0.999")), s("0.001"));
        assert_eq!(s("1.5").mul(&s("4")), s("6"));
        assert_eq!(
            s("123456789123456789").add(&s("1")),
            s("123456789123456790")
        );
    }

    #[test]
    fn comparisons() {
        assert!(s("1.5") < s("2"));
        assert!(s("-3") < s("0.001"));
        assert!(s("10") == s("1e1"));
        assert!(s("2.50") == s("2.5"));
    }

    #[test]
    fn rounding() {
        assert_eq!(s("1.5").floor(), s("1"));
        assert_eq!(s("-1.5").floor(), s("-2"));
        assert_eq!(s("1.5").ceil(), s("2"));
        assert_eq!(s("-1.5").ceil(), s("-1"));
        assert_eq!(s("3").floor(), s("3"));
    }

    #[test]
    fn integral_conversions() {
        assert_eq!(s("42").to_i64(), Some(42));
        assert_eq!(s("1.5").to_i64(), None);
        assert_eq!(s("1e19").to_i64(), None);
        assert_eq!(Scientific::from_f64(0.5), Some(s("0.5")));
        assert_eq!(Scientific::from_f64(f64::INFINITY), None);
    }
}
