//! String-in, string-out arithmetic for exchange payloads.
//!
//! Exchanges report amounts, costs and fees as strings; these helpers combine
//! them through [`Decimal`] so that aggregation (`filled + remaining`,
//! `cost / filled`) never passes through a float.

use crate::decimal::Decimal;
use crate::error::Result;

/// Fractional digits kept by [`string_div`] when no scale is given.
pub const DEFAULT_STRING_DIV_SCALE: u32 = 18;

fn parse(value: &str) -> Result<Decimal> {
    value.parse()
}

fn binary(a: &str, b: &str, op: impl FnOnce(&Decimal, &Decimal) -> Result<Decimal>) -> Result<String> {
    Ok(op(&parse(a)?, &parse(b)?)?.to_string())
}

pub fn string_add(a: &str, b: &str) -> Result<String> {
    binary(a, b, |x, y| Ok(x.add(y)))
}

pub fn string_sub(a: &str, b: &str) -> Result<String> {
    binary(a, b, |x, y| Ok(x.subtract(y)))
}

pub fn string_mul(a: &str, b: &str) -> Result<String> {
    binary(a, b, Decimal::multiply)
}

/// `a / b` truncated toward zero to `scale` fractional digits (18 by default).
pub fn string_div(a: &str, b: &str, scale: Option<u32>) -> Result<String> {
    let quotient = parse(a)?.div_to_scale(&parse(b)?, scale.unwrap_or(DEFAULT_STRING_DIV_SCALE))?;
    Ok(quotient.to_string())
}

/// Remainder with the sign of `a`.
pub fn string_mod(a: &str, b: &str) -> Result<String> {
    Ok(parse(a)?.rem(&parse(b)?)?.to_string())
}

pub fn string_neg(a: &str) -> Result<String> {
    Ok(parse(a)?.negate().to_string())
}

pub fn string_abs(a: &str) -> Result<String> {
    Ok(parse(a)?.abs().to_string())
}

pub fn string_min(a: &str, b: &str) -> Result<String> {
    Ok(parse(a)?.min(parse(b)?).to_string())
}

pub fn string_max(a: &str, b: &str) -> Result<String> {
    Ok(parse(a)?.max(parse(b)?).to_string())
}

pub fn string_eq(a: &str, b: &str) -> Result<bool> {
    Ok(parse(a)? == parse(b)?)
}

pub fn string_gt(a: &str, b: &str) -> Result<bool> {
    Ok(parse(a)? > parse(b)?)
}

pub fn string_ge(a: &str, b: &str) -> Result<bool> {
    Ok(parse(a)? >= parse(b)?)
}

pub fn string_lt(a: &str, b: &str) -> Result<bool> {
    Ok(parse(a)? < parse(b)?)
}

pub fn string_le(a: &str, b: &str) -> Result<bool> {
    Ok(parse(a)? <= parse(b)?)
}
