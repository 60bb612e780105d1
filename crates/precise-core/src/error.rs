use std::fmt::Display;
use thiserror::Error;

/// Errors raised by the numeric core.
///
/// Division silently caps its result at the working precision; that is
/// documented behavior of [`crate::Decimal::divide`] and never reported here.
#[derive(Debug, Error)]
pub enum PrecisionError {
    /// Input is not a plain decimal number (`-`, digits, at most one `.`).
    #[error("invalid number: {0}")]
    InvalidNumber(String),

    /// A precision, rounding or counting combination that cannot be applied.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("market not found: {0}")]
    UnknownMarket(String),

    #[error("currency not found: {0}")]
    UnknownCurrency(String),

    /// Market catalog could not be decoded
    #[error("catalog error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PrecisionError>;

impl PrecisionError {
    pub(crate) fn invalid_number(input: impl Display, reason: impl Display) -> Self {
        PrecisionError::InvalidNumber(format!("{}: {}", input, reason))
    }

    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        PrecisionError::InvalidArgument(msg.into())
    }
}
