//! Helpers for plain decimal strings: validation, float rendering and digit
//! counting. Every other module goes through [`parse_numeric`] so that the
//! accepted syntax is identical everywhere.

use crate::decimal::Decimal;
use crate::error::{PrecisionError, Result};
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use std::borrow::Cow;

/// A validated decimal string split around its point.
///
/// `integer` and `fraction` hold ASCII digits only; either may be empty but
/// not both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedNumber<'a> {
    pub negative: bool,
    pub integer: &'a str,
    pub fraction: &'a str,
}

impl ParsedNumber<'_> {
    pub fn is_zero(&self) -> bool {
        self.integer
            .bytes()
            .chain(self.fraction.bytes())
            .all(|b| b == b'0')
    }
}

/// Validate a plain decimal string: an optional leading `-`, digits and at
/// most one `.`. Exponent notation is rejected.
pub fn parse_numeric(input: &str) -> Result<ParsedNumber<'_>> {
    let (negative, body) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    let (integer, fraction) = body.split_once('.').unwrap_or((body, ""));

    if let Some(bad) = integer
        .chars()
        .chain(fraction.chars())
        .find(|c| !c.is_ascii_digit())
    {
        return Err(PrecisionError::invalid_number(
            input,
            format!("contains an illegal character '{}'", bad),
        ));
    }

    if integer.is_empty() && fraction.is_empty() {
        return Err(PrecisionError::invalid_number(input, "no digits"));
    }

    Ok(ParsedNumber {
        negative,
        integer,
        fraction,
    })
}

/// Render a float as a fixed-point string without exponent notation.
///
/// Uses the shortest digit sequence that reads back as the same float, so
/// `7.8e-7` becomes `"0.00000078"` rather than its binary expansion.
pub fn number_to_string(value: f64) -> Result<String> {
    if !value.is_finite() {
        return Err(PrecisionError::invalid_number(value, "not a finite number"));
    }
    if value == 0.0 {
        // also folds -0.0
        return Ok("0".to_string());
    }
    Ok(format!("{}", value))
}

/// Number of base-10 digits in `|value|`. Zero has one digit.
pub fn digit_count(value: &BigInt) -> u64 {
    if value.is_zero() {
        return 1;
    }
    value.magnitude().to_str_radix(10).len() as u64
}

/// Count the fractional digits a precision string carries, ignoring trailing
/// zeros. Understands exponent notation, so `"1e-8"` yields `8` and `"1e2"`
/// yields `-2`.
pub fn precision_from_string(value: &str) -> i32 {
    if let Some(pos) = value.find(['e', 'E']) {
        if let Ok(exponent) = value[pos + 1..].parse::<i32>() {
            return precision_from_string(&value[..pos]).saturating_sub(exponent);
        }
    }

    match value.split_once('.') {
        Some((_, fraction)) => fraction.trim_end_matches('0').len() as i32,
        None => 0,
    }
}

/// Largest exponent [`expand_exponent`] writes out in full.
const MAX_EXPANDED_EXPONENT: u32 = 4096;

/// Rewrite exponent notation as a plain decimal string, so `"1e-8"` becomes
/// `"0.00000001"` and `"2.5E3"` becomes `"2500"`. Input without an exponent
/// is returned unchanged.
pub fn expand_exponent(value: &str) -> Result<Cow<'_, str>> {
    let Some(pos) = value.find(['e', 'E']) else {
        return Ok(Cow::Borrowed(value));
    };

    let exponent: i32 = value[pos + 1..]
        .parse()
        .map_err(|_| PrecisionError::invalid_number(value, "malformed exponent"))?;
    if exponent.unsigned_abs() > MAX_EXPANDED_EXPONENT {
        return Err(PrecisionError::invalid_number(value, "exponent too large"));
    }

    let base: Decimal = value[..pos].parse()?;
    let expanded = Decimal::try_new(
        base.mantissa().clone(),
        i64::from(base.exponent()) + i64::from(exponent),
    )?;
    Ok(Cow::Owned(expanded.to_string()))
}

/// A number handed to the formatting functions: exchange payloads mix
/// strings, floats and integers, so each is accepted as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericInput {
    Str(String),
    Float(f64),
    Int(i64),
    Decimal(Decimal),
}

impl NumericInput {
    /// Plain decimal text for this input. Strings are passed through
    /// unvalidated; floats go through [`number_to_string`].
    pub fn to_plain_string(&self) -> Result<Cow<'_, str>> {
        match self {
            NumericInput::Str(s) => Ok(Cow::Borrowed(s.as_str())),
            NumericInput::Float(f) => number_to_string(*f).map(Cow::Owned),
            NumericInput::Int(i) => Ok(Cow::Owned(i.to_string())),
            NumericInput::Decimal(d) => Ok(Cow::Owned(d.to_string())),
        }
    }

    /// Read the input as a precision step. Exchanges publish steps like
    /// `"1e-8"`, so exponent notation is accepted here.
    pub fn to_decimal(&self) -> Result<Decimal> {
        match self {
            NumericInput::Decimal(d) => Ok(d.clone()),
            NumericInput::Int(i) => Ok(Decimal::from(*i)),
            other => expand_exponent(&other.to_plain_string()?)?.parse(),
        }
    }

    /// Interpret the input as a digit count (decimal places or significant
    /// digits). Fractional values are rejected.
    pub fn to_digit_count(&self) -> Result<i32> {
        let text = self.to_plain_string()?;
        let value: Decimal = expand_exponent(&text)?.parse()?;
        if value.exponent() != 0 {
            return Err(PrecisionError::invalid_argument(format!(
                "precision {} must be an integer digit count",
                text
            )));
        }
        value.mantissa().to_i32().ok_or_else(|| {
            PrecisionError::invalid_argument(format!("precision {} is out of range", text))
        })
    }
}

impl From<&str> for NumericInput {
    fn from(value: &str) -> Self {
        NumericInput::Str(value.to_string())
    }
}

impl From<String> for NumericInput {
    fn from(value: String) -> Self {
        NumericInput::Str(value)
    }
}

impl From<&String> for NumericInput {
    fn from(value: &String) -> Self {
        NumericInput::Str(value.clone())
    }
}

impl From<f64> for NumericInput {
    fn from(value: f64) -> Self {
        NumericInput::Float(value)
    }
}

impl From<i64> for NumericInput {
    fn from(value: i64) -> Self {
        NumericInput::Int(value)
    }
}

impl From<i32> for NumericInput {
    fn from(value: i32) -> Self {
        NumericInput::Int(i64::from(value))
    }
}

impl From<u32> for NumericInput {
    fn from(value: u32) -> Self {
        NumericInput::Int(i64::from(value))
    }
}

impl From<u64> for NumericInput {
    fn from(value: u64) -> Self {
        NumericInput::Str(value.to_string())
    }
}

impl From<Decimal> for NumericInput {
    fn from(value: Decimal) -> Self {
        NumericInput::Decimal(value)
    }
}

impl From<&Decimal> for NumericInput {
    fn from(value: &Decimal) -> Self {
        NumericInput::Decimal(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric_accepts_plain_decimals() {
        let parsed = parse_numeric("-123.450").unwrap();
        assert!(parsed.negative);
        assert_eq!(parsed.integer, "123");
        assert_eq!(parsed.fraction, "450");

        let parsed = parse_numeric(".5").unwrap();
        assert_eq!(parsed.integer, "");
        assert_eq!(parsed.fraction, "5");

        assert!(parse_numeric("7.").is_ok());
        assert!(parse_numeric("-0.000").unwrap().is_zero());
    }

    #[test]
    fn test_parse_numeric_rejects_garbage() {
        for bad in ["foo", "", "-", ".", "1.2.3", "--1", "+1", "1e5", " 1", "1,5"] {
            assert!(
                matches!(parse_numeric(bad), Err(PrecisionError::InvalidNumber(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_number_to_string() {
        assert_eq!(number_to_string(7.8e-7).unwrap(), "0.00000078");
        assert_eq!(
            number_to_string(7e27).unwrap(),
            "7000000000000000000000000000"
        );
        assert_eq!(number_to_string(-1.5).unwrap(), "-1.5");
        assert_eq!(number_to_string(0.1).unwrap(), "0.1");
        assert_eq!(number_to_string(-0.0).unwrap(), "0");
        assert_eq!(number_to_string(42.0).unwrap(), "42");
        assert!(number_to_string(f64::NAN).is_err());
        assert!(number_to_string(f64::INFINITY).is_err());
    }

    #[test]
    fn test_digit_count() {
        assert_eq!(digit_count(&BigInt::from(0)), 1);
        assert_eq!(digit_count(&BigInt::from(9)), 1);
        assert_eq!(digit_count(&BigInt::from(-10)), 2);
        assert_eq!(digit_count(&BigInt::from(123_456_789u64)), 9);
        assert_eq!(digit_count(&BigInt::from(10).pow(40)), 41);
    }

    #[test]
    fn test_precision_from_string() {
        assert_eq!(precision_from_string("0.001"), 3);
        assert_eq!(precision_from_string("0.00100"), 3);
        assert_eq!(precision_from_string("1.2345"), 4);
        assert_eq!(precision_from_string("100"), 0);
        assert_eq!(precision_from_string("1e-8"), 8);
        assert_eq!(precision_from_string("2.5e-3"), 4);
        assert_eq!(precision_from_string("1e2"), -2);
    }

    #[test]
    fn test_expand_exponent() {
        assert_eq!(expand_exponent("1e-8").unwrap(), "0.00000001");
        assert_eq!(expand_exponent("2.5E-3").unwrap(), "0.0025");
        assert_eq!(expand_exponent("2.5e3").unwrap(), "2500");
        assert_eq!(expand_exponent("-1e+2").unwrap(), "-100");
        assert_eq!(expand_exponent("0.001").unwrap(), "0.001");
        for bad in ["e5", "1e", "1e-x", "1e99999", "1.2.3e1"] {
            assert!(
                matches!(expand_exponent(bad), Err(PrecisionError::InvalidNumber(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_precision_steps_accept_exponents() {
        assert_eq!(NumericInput::from("1e-8").to_decimal().unwrap().to_string(), "0.00000001");
        assert_eq!(NumericInput::from("1e1").to_digit_count().unwrap(), 10);
        assert!(matches!(
            NumericInput::from("1e-1").to_digit_count(),
            Err(PrecisionError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_digit_count_input() {
        assert_eq!(NumericInput::from(8).to_digit_count().unwrap(), 8);
        assert_eq!(NumericInput::from("-2").to_digit_count().unwrap(), -2);
        assert_eq!(NumericInput::from(3.0).to_digit_count().unwrap(), 3);
        assert!(matches!(
            NumericInput::from("0.5").to_digit_count(),
            Err(PrecisionError::InvalidArgument(_))
        ));
        assert!(matches!(
            NumericInput::from("99999999999").to_digit_count(),
            Err(PrecisionError::InvalidArgument(_))
        ));
        assert!(matches!(
            NumericInput::from("two").to_digit_count(),
            Err(PrecisionError::InvalidNumber(_))
        ));
    }
}
