//! Arbitrary-precision decimal value.
//!
//! A [`Decimal`] is `mantissa × 10^exponent` with a `BigInt` mantissa. Every
//! value is kept normalized:
//! - a positive exponent is folded into the mantissa,
//! - trailing zeros are stripped while the exponent is negative,
//! - zero is stored as `(0, 0)`.
//!
//! The representation is therefore canonical and derived equality is value
//! equality. Addition, subtraction and multiplication are exact; division
//! keeps at most [`DEFAULT_DIVISION_PRECISION`] significant digits unless a
//! precision is given explicitly.

use crate::error::{PrecisionError, Result};
use crate::number::{digit_count, number_to_string, parse_numeric};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;
use tracing::debug;

/// Significant digits kept by [`Decimal::divide`].
pub const DEFAULT_DIVISION_PRECISION: u32 = 50;

/// Upper bound accepted by [`Decimal::round_away_from_zero`].
const MAX_ROUNDING_DIGITS: i64 = 2_000_000_000;

fn pow10(n: u32) -> BigInt {
    BigInt::from(10u32).pow(n)
}

fn to_pow(n: i64, what: &str) -> Result<u32> {
    u32::try_from(n).map_err(|_| PrecisionError::invalid_argument(format!("{} out of range: {}", what, n)))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal {
    mantissa: BigInt,
    exponent: i32,
}

impl Decimal {
    /// Build `mantissa × 10^exponent` and normalize it.
    pub fn new(mantissa: BigInt, exponent: i32) -> Self {
        let mut mantissa = mantissa;
        let mut exponent = exponent;

        if mantissa.is_zero() {
            return Self::zero();
        }
        if exponent > 0 {
            mantissa *= pow10(exponent.unsigned_abs());
            exponent = 0;
        }

        let ten = BigInt::from(10u32);
        while exponent < 0 {
            let (quotient, remainder) = mantissa.div_rem(&ten);
            if !remainder.is_zero() {
                break;
            }
            mantissa = quotient;
            exponent += 1;
        }

        Self { mantissa, exponent }
    }

    /// Normalize a result computed with a widened exponent. Fails when the
    /// exponent still lies outside the `i32` range after trailing zeros are
    /// stripped.
    pub(crate) fn try_new(mantissa: BigInt, exponent: i64) -> Result<Self> {
        if mantissa.is_zero() {
            return Ok(Self::zero());
        }

        let mut mantissa = mantissa;
        let mut exponent = exponent;
        let ten = BigInt::from(10u32);
        while exponent < i64::from(i32::MIN) {
            let (quotient, remainder) = mantissa.div_rem(&ten);
            if !remainder.is_zero() {
                break;
            }
            mantissa = quotient;
            exponent += 1;
        }

        let exponent = i32::try_from(exponent).map_err(|_| {
            PrecisionError::invalid_argument(format!("exponent out of range: {}", exponent))
        })?;
        Ok(Self::new(mantissa, exponent))
    }

    pub fn zero() -> Self {
        Self {
            mantissa: BigInt::zero(),
            exponent: 0,
        }
    }

    pub fn one() -> Self {
        Self {
            mantissa: BigInt::one(),
            exponent: 0,
        }
    }

    /// Parse a plain decimal string such as `"-12.340"`.
    pub fn parse(s: &str) -> Result<Self> {
        s.parse()
    }

    pub fn mantissa(&self) -> &BigInt {
        &self.mantissa
    }

    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    /// Digits after the decimal point in the canonical rendering.
    pub fn decimal_places(&self) -> u32 {
        if self.exponent < 0 {
            self.exponent.unsigned_abs()
        } else {
            0
        }
    }

    /// Mantissa digits excluding trailing zeros (an integer like `1200` has two).
    pub fn significant_digits(&self) -> u64 {
        if self.mantissa.is_zero() {
            return 0;
        }
        let digits = self.mantissa.magnitude().to_str_radix(10);
        digits.trim_end_matches('0').len() as u64
    }

    /// Re-apply normalization. Values are always normalized, so this returns
    /// an equal value.
    pub fn normalize(&self) -> Self {
        Self::new(self.mantissa.clone(), self.exponent)
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa.is_negative()
    }

    pub fn is_positive(&self) -> bool {
        self.mantissa.is_positive()
    }

    pub fn negate(&self) -> Self {
        Self {
            mantissa: -&self.mantissa,
            exponent: self.exponent,
        }
    }

    pub fn abs(&self) -> Self {
        Self {
            mantissa: self.mantissa.abs(),
            exponent: self.exponent,
        }
    }

    /// Both mantissas rescaled to the smaller of the two exponents.
    pub(crate) fn aligned_mantissas(&self, other: &Self) -> (BigInt, BigInt, i32) {
        let exponent = self.exponent.min(other.exponent);
        let scale = |d: &Self| {
            let by = d.exponent.abs_diff(exponent);
            if by == 0 {
                d.mantissa.clone()
            } else {
                &d.mantissa * pow10(by)
            }
        };
        (scale(self), scale(other), exponent)
    }

    pub fn add(&self, other: &Self) -> Self {
        let (a, b, exponent) = self.aligned_mantissas(other);
        Self::new(a + b, exponent)
    }

    pub fn subtract(&self, other: &Self) -> Self {
        let (a, b, exponent) = self.aligned_mantissas(other);
        Self::new(a - b, exponent)
    }

    /// Exact product. Fails only when the combined exponent leaves the `i32`
    /// range.
    pub fn multiply(&self, other: &Self) -> Result<Self> {
        let exponent = i64::from(self.exponent) + i64::from(other.exponent);
        Self::try_new(&self.mantissa * &other.mantissa, exponent)
    }

    /// Divide keeping [`DEFAULT_DIVISION_PRECISION`] significant digits.
    ///
    /// The quotient is truncated toward zero; digits past the working
    /// precision are dropped without error.
    pub fn divide(&self, other: &Self) -> Result<Self> {
        self.divide_with_precision(other, DEFAULT_DIVISION_PRECISION)
    }

    /// Divide keeping at most `precision` significant digits (minimum one).
    pub fn divide_with_precision(&self, other: &Self, precision: u32) -> Result<Self> {
        if other.is_zero() {
            return Err(PrecisionError::DivisionByZero);
        }
        if self.is_zero() {
            return Ok(Self::zero());
        }

        let precision = i64::from(precision.max(1));
        let dividend_digits = digit_count(&self.mantissa) as i64;
        let divisor_digits = digit_count(&other.mantissa) as i64;

        // quotient of (a * 10^shift) / b has at least precision + 1 digits
        let shift = (precision + divisor_digits - dividend_digits + 1).max(0);
        let numerator = &self.mantissa * pow10(to_pow(shift, "division shift")?);
        let (quotient, remainder) = numerator.div_rem(&other.mantissa);

        let exponent = i64::from(self.exponent) - i64::from(other.exponent) - shift;
        let excess = digit_count(&quotient) as i64 - precision;
        let (quotient, exponent) = if excess > 0 {
            (&quotient / pow10(to_pow(excess, "division excess")?), exponent + excess)
        } else {
            (quotient, exponent)
        };

        if !remainder.is_zero() || excess > 0 {
            debug!(precision, "division result capped at working precision");
        }

        Self::try_new(quotient, exponent)
    }

    /// Quotient truncated toward zero to `scale` fractional digits.
    pub fn div_to_scale(&self, other: &Self, scale: u32) -> Result<Self> {
        if other.is_zero() {
            return Err(PrecisionError::DivisionByZero);
        }

        let distance = i64::from(scale) + i64::from(self.exponent) - i64::from(other.exponent);
        let numerator = match distance.cmp(&0) {
            Ordering::Equal => self.mantissa.clone(),
            Ordering::Greater => &self.mantissa * pow10(to_pow(distance, "division scale")?),
            Ordering::Less => &self.mantissa / pow10(to_pow(-distance, "division scale")?),
        };

        let exponent = i32::try_from(scale)
            .map_err(|_| PrecisionError::invalid_argument(format!("scale out of range: {}", scale)))?;
        Ok(Self::new(numerator / &other.mantissa, -exponent))
    }

    /// Exact remainder of truncated division; takes the sign of `self`.
    pub fn rem(&self, other: &Self) -> Result<Self> {
        if other.is_zero() {
            return Err(PrecisionError::DivisionByZero);
        }
        let (a, b, exponent) = self.aligned_mantissas(other);
        Ok(Self::new(a % b, exponent))
    }

    /// Keep at most `precision` mantissa digits, dropping the least
    /// significant ones toward zero.
    pub fn truncate(&self, precision: i64) -> Result<Self> {
        if precision <= 0 {
            return Err(PrecisionError::invalid_argument(format!(
                "truncate precision must be positive, got {}",
                precision
            )));
        }

        let excess = digit_count(&self.mantissa) as i64 - precision;
        if excess <= 0 {
            return Ok(self.clone());
        }

        let mantissa = &self.mantissa / pow10(to_pow(excess, "truncate precision")?);
        Ok(Self::new(mantissa, self.exponent.saturating_add(excess as i32)))
    }

    /// Round to `digits` fractional digits, halves away from zero.
    ///
    /// The decision is taken once from the original digits at the cut, so
    /// `1.45` rounds to `1` at zero digits and to `1.5` at one digit.
    pub fn round_away_from_zero(&self, digits: i64) -> Result<Self> {
        if !(0..=MAX_ROUNDING_DIGITS).contains(&digits) {
            return Err(PrecisionError::invalid_argument(format!(
                "rounding digits must be within 0..={}, got {}",
                MAX_ROUNDING_DIGITS, digits
            )));
        }
        if i64::from(self.exponent) >= -digits {
            return Ok(self.clone());
        }

        let dropped = -i64::from(self.exponent) - digits;
        let divisor = pow10(to_pow(dropped, "rounding digits")?);
        let (mut magnitude, remainder) = self.mantissa.abs().div_rem(&divisor);
        if remainder * 2u32 >= divisor {
            magnitude += BigInt::one();
        }
        let mantissa = if self.is_negative() { -magnitude } else { magnitude };

        // digits <= 2e9 < i32::MAX
        Ok(Self::new(mantissa, -(digits as i32)))
    }

    /// Drop every fractional digit (toward zero). `|value| < 1` gives zero.
    pub fn floor(&self) -> Self {
        if self.exponent >= 0 {
            return self.clone();
        }
        if digit_count(&self.mantissa) as i64 + i64::from(self.exponent) <= 0 {
            return Self::zero();
        }
        Self::new(&self.mantissa / pow10(self.exponent.unsigned_abs()), 0)
    }

    pub fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    pub fn equals(&self, other: &Self) -> bool {
        self == other
    }
}

impl Default for Decimal {
    fn default() -> Self {
        Self::zero()
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.mantissa.sign().cmp(&other.mantissa.sign()) {
            Ordering::Equal => {
                let (a, b, _) = self.aligned_mantissas(other);
                a.cmp(&b)
            }
            unequal => unequal,
        }
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Decimal {
    type Err = PrecisionError;

    fn from_str(s: &str) -> Result<Self> {
        let parsed = parse_numeric(s)?;
        let digits = format!("{}{}", parsed.integer, parsed.fraction);
        let magnitude = BigInt::parse_bytes(digits.as_bytes(), 10)
            .ok_or_else(|| PrecisionError::invalid_number(s, "unparseable digits"))?;
        let exponent = i32::try_from(parsed.fraction.len())
            .map_err(|_| PrecisionError::invalid_number(s, "too many fractional digits"))?;

        let mantissa = if parsed.negative { -magnitude } else { magnitude };
        Ok(Self::new(mantissa, -exponent))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.magnitude().to_str_radix(10);
        if self.is_negative() {
            f.write_str("-")?;
        }

        if self.exponent >= 0 {
            f.write_str(&digits)?;
            return f.write_str(&"0".repeat(self.exponent.unsigned_abs() as usize));
        }

        let fraction_len = self.exponent.unsigned_abs() as usize;
        if digits.len() > fraction_len {
            let (integer, fraction) = digits.split_at(digits.len() - fraction_len);
            write!(f, "{}.{}", integer, fraction)
        } else {
            write!(f, "0.{}{}", "0".repeat(fraction_len - digits.len()), digits)
        }
    }
}

impl From<BigInt> for Decimal {
    fn from(value: BigInt) -> Self {
        Self::new(value, 0)
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Self::new(BigInt::from(value), 0)
    }
}

impl From<i32> for Decimal {
    fn from(value: i32) -> Self {
        Self::new(BigInt::from(value), 0)
    }
}

impl From<u64> for Decimal {
    fn from(value: u64) -> Self {
        Self::new(BigInt::from(value), 0)
    }
}

impl TryFrom<f64> for Decimal {
    type Error = PrecisionError;

    /// Uses the shortest decimal digits that read back as `value`, i.e. the
    /// smallest exponent whose mantissa reproduces the float.
    fn try_from(value: f64) -> Result<Self> {
        number_to_string(value)?.parse()
    }
}

impl From<rust_decimal::Decimal> for Decimal {
    fn from(value: rust_decimal::Decimal) -> Self {
        Self::new(BigInt::from(value.mantissa()), -(value.scale() as i32))
    }
}

impl TryFrom<&Decimal> for rust_decimal::Decimal {
    type Error = PrecisionError;

    fn try_from(value: &Decimal) -> Result<Self> {
        rust_decimal::Decimal::from_str_exact(&value.to_string()).map_err(|e| {
            PrecisionError::invalid_argument(format!("{} does not fit rust_decimal: {}", value, e))
        })
    }
}

impl ToPrimitive for Decimal {
    fn to_i64(&self) -> Option<i64> {
        self.floor().mantissa.to_i64()
    }

    fn to_u64(&self) -> Option<u64> {
        self.floor().mantissa.to_u64()
    }

    fn to_f64(&self) -> Option<f64> {
        self.to_string().parse().ok()
    }
}

impl Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        self.negate()
    }
}

impl Neg for &Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        self.negate()
    }
}

macro_rules! forward_binop {
    ($trait:ident, $method:ident, $inherent:ident) => {
        impl $trait<&Decimal> for &Decimal {
            type Output = Decimal;

            fn $method(self, rhs: &Decimal) -> Decimal {
                Decimal::$inherent(self, rhs)
            }
        }

        impl $trait for Decimal {
            type Output = Decimal;

            fn $method(self, rhs: Decimal) -> Decimal {
                Decimal::$inherent(&self, &rhs)
            }
        }

        impl $trait<&Decimal> for Decimal {
            type Output = Decimal;

            fn $method(self, rhs: &Decimal) -> Decimal {
                Decimal::$inherent(&self, rhs)
            }
        }
    };
}

forward_binop!(Add, add, add);
forward_binop!(Sub, sub, subtract);

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

struct DecimalVisitor;

impl<'de> Visitor<'de> for DecimalVisitor {
    type Value = Decimal;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal number or numeric string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Decimal, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Decimal, E> {
        Ok(Decimal::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Decimal, E> {
        Ok(Decimal::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Decimal, E> {
        Decimal::try_from(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(DecimalVisitor)
    }
}
