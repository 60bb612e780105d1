use crate::decimal::Decimal;
use crate::error::{PrecisionError, Result};
use crate::number::{parse_numeric, precision_from_string, NumericInput, ParsedNumber};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundingMode {
    /// Half away from zero
    Round,
    /// Toward zero
    Truncate,
}

/// How the precision argument is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CountingMode {
    /// Digits after the decimal point; negative values cut into the integer part.
    #[default]
    DecimalPlaces,
    /// Digits counted from the first nonzero digit.
    SignificantDigits,
    /// The precision is a step and the result a multiple of it.
    TickSize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaddingMode {
    #[default]
    NoPadding,
    PadWithZero,
}

pub const ROUND: RoundingMode = RoundingMode::Round;
pub const TRUNCATE: RoundingMode = RoundingMode::Truncate;
pub const DECIMAL_PLACES: CountingMode = CountingMode::DecimalPlaces;
pub const SIGNIFICANT_DIGITS: CountingMode = CountingMode::SignificantDigits;
pub const TICK_SIZE: CountingMode = CountingMode::TickSize;
pub const NO_PADDING: PaddingMode = PaddingMode::NoPadding;
pub const PAD_WITH_ZERO: PaddingMode = PaddingMode::PadWithZero;

fn mode_key(s: &str) -> String {
    s.trim().to_ascii_uppercase().replace('-', "_")
}

impl FromStr for RoundingMode {
    type Err = PrecisionError;

    fn from_str(s: &str) -> Result<Self> {
        match mode_key(s).as_str() {
            "ROUND" => Ok(RoundingMode::Round),
            "TRUNCATE" => Ok(RoundingMode::Truncate),
            _ => Err(PrecisionError::invalid_argument(format!("unknown rounding mode: {}", s))),
        }
    }
}

impl FromStr for CountingMode {
    type Err = PrecisionError;

    fn from_str(s: &str) -> Result<Self> {
        match mode_key(s).as_str() {
            "DECIMAL_PLACES" => Ok(CountingMode::DecimalPlaces),
            "SIGNIFICANT_DIGITS" => Ok(CountingMode::SignificantDigits),
            "TICK_SIZE" => Ok(CountingMode::TickSize),
            _ => Err(PrecisionError::invalid_argument(format!("unknown counting mode: {}", s))),
        }
    }
}

impl FromStr for PaddingMode {
    type Err = PrecisionError;

    fn from_str(s: &str) -> Result<Self> {
        match mode_key(s).as_str() {
            "NO_PADDING" => Ok(PaddingMode::NoPadding),
            "PAD_WITH_ZERO" => Ok(PaddingMode::PadWithZero),
            _ => Err(PrecisionError::invalid_argument(format!("unknown padding mode: {}", s))),
        }
    }
}

impl fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RoundingMode::Round => "ROUND",
            RoundingMode::Truncate => "TRUNCATE",
        })
    }
}

impl fmt::Display for CountingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CountingMode::DecimalPlaces => "DECIMAL_PLACES",
            CountingMode::SignificantDigits => "SIGNIFICANT_DIGITS",
            CountingMode::TickSize => "TICK_SIZE",
        })
    }
}

impl fmt::Display for PaddingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PaddingMode::NoPadding => "NO_PADDING",
            PaddingMode::PadWithZero => "PAD_WITH_ZERO",
        })
    }
}

/// Format `value` to the requested precision.
///
/// `precision` is a digit count for `DecimalPlaces` / `SignificantDigits`
/// (negative counts cut into the integer part) and a positive step for
/// `TickSize`. Rounding is half away from zero, decided once from the
/// original digits at the cut. Zero is always rendered without a sign.
///
/// Examples:
/// - `("12.3456", TRUNCATE, 2, DECIMAL_PLACES, NO_PADDING)` gives `"12.34"`
/// - `("9.999", ROUND, 2, DECIMAL_PLACES, PAD_WITH_ZERO)` gives `"10.00"`
/// - `("165", ROUND, "110", TICK_SIZE, NO_PADDING)` gives `"220"`
pub fn decimal_to_precision(
    value: impl Into<NumericInput>,
    rounding_mode: RoundingMode,
    precision: impl Into<NumericInput>,
    counting_mode: CountingMode,
    padding_mode: PaddingMode,
) -> Result<String> {
    let value = value.into();
    let precision = precision.into();
    let text = value.to_plain_string()?;
    trace!(value = %text, %rounding_mode, %counting_mode, %padding_mode, "decimal_to_precision");

    match counting_mode {
        CountingMode::TickSize => {
            let value: Decimal = text.parse()?;
            let tick = precision.to_decimal()?;
            round_to_tick(&value, rounding_mode, &tick, padding_mode)
        }
        CountingMode::DecimalPlaces | CountingMode::SignificantDigits => {
            let number = parse_numeric(&text)?;
            let digits = precision.to_digit_count()?;
            Ok(format_digits(&number, rounding_mode, digits, counting_mode, padding_mode))
        }
    }
}

/// [`decimal_to_precision`] with `DECIMAL_PLACES` and `NO_PADDING`.
pub fn decimal_to_precision_default(
    value: impl Into<NumericInput>,
    rounding_mode: RoundingMode,
    precision: impl Into<NumericInput>,
) -> Result<String> {
    decimal_to_precision(value, rounding_mode, precision, DECIMAL_PLACES, NO_PADDING)
}

fn round_to_tick(
    value: &Decimal,
    rounding_mode: RoundingMode,
    tick: &Decimal,
    padding_mode: PaddingMode,
) -> Result<String> {
    if tick.is_negative() {
        return Err(PrecisionError::invalid_argument(format!(
            "TICK_SIZE cannot be used with a negative precision ({})",
            tick
        )));
    }
    if tick.is_zero() {
        return Err(PrecisionError::invalid_argument("TICK_SIZE requires a non-zero tick"));
    }

    let (dividend, divisor, _) = value.aligned_mantissas(tick);
    let (mut quotient, remainder) = dividend.div_rem(&divisor);

    if rounding_mode == RoundingMode::Round && remainder.abs() * 2u32 >= divisor {
        if dividend.is_negative() {
            quotient -= BigInt::one();
        } else {
            quotient += BigInt::one();
        }
    }

    let snapped = Decimal::from(quotient).multiply(tick)?;
    if !remainder.is_zero() {
        debug!(value = %value, tick = %tick, result = %snapped, "value moved onto tick");
    }

    let places = precision_from_string(&tick.to_string());
    let text = snapped.to_string();
    let number = parse_numeric(&text)?;
    Ok(format_digits(
        &number,
        RoundingMode::Round,
        places,
        CountingMode::DecimalPlaces,
        padding_mode,
    ))
}

fn format_digits(
    number: &ParsedNumber<'_>,
    rounding_mode: RoundingMode,
    precision: i32,
    counting_mode: CountingMode,
    padding_mode: PaddingMode,
) -> String {
    if counting_mode == CountingMode::SignificantDigits && precision == 0 {
        return "0".to_string();
    }
    // negative counts always address the integer part
    let counting_mode = if precision < 0 {
        CountingMode::DecimalPlaces
    } else {
        counting_mode
    };

    let precision = i64::from(precision);
    let mut buffer = DigitBuffer::new(number);
    let cut = match counting_mode {
        CountingMode::SignificantDigits => buffer.first_nonzero().unwrap_or(1) as i64 + precision,
        _ => buffer.point as i64 + precision,
    };
    buffer.cut_at(cut, rounding_mode);

    // a carry can move the first significant digit one place left
    let precision_end = match counting_mode {
        CountingMode::SignificantDigits => buffer.first_nonzero().unwrap_or(1) as i64 + precision,
        _ => cut,
    };
    buffer.render(precision_end, padding_mode)
}

/// Digits of a number with one spare leading zero, so that `999 -> 1000`
/// has room to carry.
struct DigitBuffer {
    negative: bool,
    digits: Vec<u8>,
    /// Index of the first fractional digit.
    point: usize,
}

impl DigitBuffer {
    fn new(number: &ParsedNumber<'_>) -> Self {
        let mut digits = Vec::with_capacity(1 + number.integer.len() + number.fraction.len());
        digits.push(0);
        digits.extend(number.integer.bytes().map(|b| b - b'0'));
        let point = digits.len();
        digits.extend(number.fraction.bytes().map(|b| b - b'0'));

        Self {
            negative: number.negative,
            digits,
            point,
        }
    }

    fn first_nonzero(&self) -> Option<usize> {
        self.digits.iter().position(|&d| d != 0)
    }

    fn last_nonzero(&self) -> Option<usize> {
        self.digits.iter().rposition(|&d| d != 0)
    }

    /// Zero every digit from `cut` on, rounding on the first dropped digit.
    fn cut_at(&mut self, cut: i64, rounding_mode: RoundingMode) {
        if cut >= self.digits.len() as i64 {
            return;
        }
        if cut < 0 {
            self.digits.fill(0);
            return;
        }

        let cut = cut as usize;
        let round_up = rounding_mode == RoundingMode::Round && self.digits[cut] >= 5;
        self.digits[cut..].fill(0);

        if round_up {
            for digit in self.digits[..cut].iter_mut().rev() {
                if *digit == 9 {
                    *digit = 0;
                } else {
                    *digit += 1;
                    break;
                }
            }
        }
    }

    fn render(&self, precision_end: i64, padding_mode: PaddingMode) -> String {
        let first = self.first_nonzero();
        let read_start = match first {
            Some(i) if i < self.point => i,
            _ => self.point - 1,
        };
        let read_end = match self.last_nonzero() {
            Some(i) if i >= self.point => i + 1,
            _ => self.point,
        };

        let actual = (read_end - read_start) as i64;
        let desired = match padding_mode {
            PaddingMode::NoPadding => actual,
            PaddingMode::PadWithZero => precision_end - read_start as i64,
        };
        let pad = (desired - actual).max(0) as usize;

        let mut out = String::with_capacity(actual as usize + pad + 2);
        if self.negative && first.is_some() {
            out.push('-');
        }
        out.extend(self.digits[read_start..self.point].iter().map(|&d| char::from(b'0' + d)));
        if read_end > self.point || pad > 0 {
            out.push('.');
            out.extend(self.digits[self.point..read_end].iter().map(|&d| char::from(b'0' + d)));
            out.extend(std::iter::repeat('0').take(pad));
        }
        out
    }
}
