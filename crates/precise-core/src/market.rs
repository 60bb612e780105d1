use crate::error::{PrecisionError, Result};
use crate::number::{number_to_string, NumericInput};
use crate::precision::{
    decimal_to_precision, CountingMode, PaddingMode, RoundingMode, ROUND, TRUNCATE,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// How market precisions are read and how results are padded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecisionConfig {
    #[serde(default)]
    pub precision_mode: CountingMode,
    #[serde(default)]
    pub padding_mode: PaddingMode,
}

/// A precision as published by an exchange: a digit count (`8`) or a tick
/// step (`"0.00000001"`), depending on the configured counting mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PrecisionValue(String);

impl PrecisionValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrecisionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrecisionValue {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&PrecisionValue> for NumericInput {
    fn from(value: &PrecisionValue) -> Self {
        NumericInput::Str(value.0.clone())
    }
}

impl<'de> Deserialize<'de> for PrecisionValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;
        let value: serde_json::Value = serde::Deserialize::deserialize(deserializer)?;
        match value {
            serde_json::Value::Number(n) => {
                // serde_json renders small floats as "1e-8"; keep them plain
                if let Some(i) = n.as_i64() {
                    Ok(Self(i.to_string()))
                } else if let Some(u) = n.as_u64() {
                    Ok(Self(u.to_string()))
                } else {
                    let f = n.as_f64().ok_or_else(|| Error::custom("Invalid number"))?;
                    number_to_string(f).map(Self).map_err(Error::custom)
                }
            }
            serde_json::Value::String(s) => Ok(Self(s)),
            _ => Err(Error::custom("Expected number or string for precision")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketPrecision {
    pub symbol: String,
    #[serde(default)]
    pub price: Option<PrecisionValue>,
    #[serde(default)]
    pub amount: Option<PrecisionValue>,
    #[serde(default)]
    pub cost: Option<PrecisionValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrencyPrecision {
    pub code: String,
    #[serde(default)]
    pub precision: Option<PrecisionValue>,
    /// Per-network overrides, e.g. a token that settles with fewer decimals
    /// on one chain.
    #[serde(default)]
    pub networks: HashMap<String, PrecisionValue>,
}

pub type MarketMap = HashMap<String, MarketPrecision>;
pub type CurrencyMap = HashMap<String, CurrencyPrecision>;

/// Serialized form of a [`MarketFormatter`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketCatalog {
    #[serde(default)]
    pub config: PrecisionConfig,
    #[serde(default)]
    pub markets: Vec<MarketPrecision>,
    #[serde(default)]
    pub currencies: Vec<CurrencyPrecision>,
}

/// Applies exchange precision metadata to order prices, amounts and fees.
#[derive(Debug, Clone, Default)]
pub struct MarketFormatter {
    config: PrecisionConfig,
    markets: MarketMap,
    currencies: CurrencyMap,
}

#[derive(Clone, Copy)]
enum Field {
    Price,
    Amount,
}

impl Field {
    fn name(self) -> &'static str {
        match self {
            Field::Price => "price",
            Field::Amount => "amount",
        }
    }
}

impl MarketFormatter {
    pub fn new(config: PrecisionConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn from_catalog(catalog: MarketCatalog) -> Self {
        let mut formatter = Self::new(catalog.config);
        for market in catalog.markets {
            formatter.insert_market(market);
        }
        for currency in catalog.currencies {
            formatter.insert_currency(currency);
        }
        formatter
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: MarketCatalog = serde_json::from_str(json)?;
        Ok(Self::from_catalog(catalog))
    }

    pub fn config(&self) -> PrecisionConfig {
        self.config
    }

    pub fn with_config(mut self, config: PrecisionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn insert_market(&mut self, market: MarketPrecision) {
        self.markets.insert(market.symbol.clone(), market);
    }

    pub fn insert_currency(&mut self, currency: CurrencyPrecision) {
        self.currencies.insert(currency.code.clone(), currency);
    }

    pub fn market(&self, symbol: &str) -> Result<&MarketPrecision> {
        self.markets
            .get(symbol)
            .ok_or_else(|| PrecisionError::UnknownMarket(symbol.to_string()))
    }

    pub fn currency(&self, code: &str) -> Result<&CurrencyPrecision> {
        self.currencies
            .get(code)
            .ok_or_else(|| PrecisionError::UnknownCurrency(code.to_string()))
    }

    fn format(
        &self,
        value: impl Into<NumericInput>,
        rounding_mode: RoundingMode,
        precision: &PrecisionValue,
    ) -> Result<String> {
        decimal_to_precision(
            value,
            rounding_mode,
            precision,
            self.config.precision_mode,
            self.config.padding_mode,
        )
    }

    fn precision_of<'a>(&self, market: &'a MarketPrecision, field: Field) -> Result<&'a PrecisionValue> {
        let precision = match field {
            Field::Price => market.price.as_ref(),
            Field::Amount => market.amount.as_ref(),
        };
        precision.ok_or_else(|| {
            PrecisionError::invalid_argument(format!(
                "market {} has no {} precision",
                market.symbol,
                field.name()
            ))
        })
    }

    /// Format with `field`'s precision and refuse results that vanish to zero.
    fn format_nonzero(
        &self,
        symbol: &str,
        value: impl Into<NumericInput>,
        rounding_mode: RoundingMode,
        field: Field,
    ) -> Result<String> {
        let market = self.market(symbol)?;
        let precision = self.precision_of(market, field)?;
        let result = self.format(value, rounding_mode, precision)?;
        if result == "0" {
            return Err(PrecisionError::invalid_argument(format!(
                "{} of {} must be greater than minimum {} precision of {}",
                field.name(),
                market.symbol,
                field.name(),
                precision
            )));
        }
        Ok(result)
    }

    /// Round a limit price onto the market's price grid.
    pub fn price_to_precision(&self, symbol: &str, price: impl Into<NumericInput>) -> Result<String> {
        self.format_nonzero(symbol, price, ROUND, Field::Price)
    }

    /// Truncate an order amount so it never exceeds what was asked for.
    pub fn amount_to_precision(&self, symbol: &str, amount: impl Into<NumericInput>) -> Result<String> {
        self.format_nonzero(symbol, amount, TRUNCATE, Field::Amount)
    }

    pub fn cost_to_precision(&self, symbol: &str, cost: impl Into<NumericInput>) -> Result<String> {
        let market = self.market(symbol)?;
        self.format(cost, TRUNCATE, self.precision_of(market, Field::Price)?)
    }

    pub fn fee_to_precision(&self, symbol: &str, fee: impl Into<NumericInput>) -> Result<String> {
        let market = self.market(symbol)?;
        self.format(fee, ROUND, self.precision_of(market, Field::Price)?)
    }

    /// Round an amount of `code` using the network precision when one is
    /// known, else the currency precision. Without either the value is
    /// returned as given. A `code` missing from the catalog is an
    /// `UnknownCurrency` error, not a pass-through.
    pub fn currency_to_precision(
        &self,
        code: &str,
        value: impl Into<NumericInput>,
        network: Option<&str>,
    ) -> Result<String> {
        let currency = self.currency(code)?;
        let precision = network
            .and_then(|n| currency.networks.get(n))
            .or(currency.precision.as_ref());

        let value = value.into();
        match precision {
            Some(precision) => self.format(value, ROUND, precision),
            None => {
                warn!("No precision known for currency {}, returning value unchanged", code);
                Ok(value.to_plain_string()?.into_owned())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precision::{PAD_WITH_ZERO, SIGNIFICANT_DIGITS, TICK_SIZE};

    const CATALOG: &str = r#"{
        "config": { "precision_mode": "TICK_SIZE" },
        "markets": [
            { "symbol": "BTC/USDT", "price": "0.01", "amount": 0.00001 },
            { "symbol": "DOGE/USDT", "price": 0.00001, "amount": 1 },
            { "symbol": "ODD/USDT" }
        ],
        "currencies": [
            { "code": "USDT", "precision": "0.000001", "networks": { "TRC20": "0.01" } },
            { "code": "XYZ" }
        ]
    }"#;

    fn formatter() -> MarketFormatter {
        MarketFormatter::from_json(CATALOG).unwrap()
    }

    #[test]
    fn test_catalog_parsing() {
        let formatter = formatter();
        assert_eq!(formatter.config().precision_mode, TICK_SIZE);
        assert_eq!(formatter.config().padding_mode, PaddingMode::NoPadding);

        let btc = formatter.market("BTC/USDT").unwrap();
        assert_eq!(btc.price.as_ref().unwrap().as_str(), "0.01");
        // numeric precisions must not come back in exponent notation
        assert_eq!(btc.amount.as_ref().unwrap().as_str(), "0.00001");

        assert!(matches!(
            formatter.market("ETH/USDT"),
            Err(PrecisionError::UnknownMarket(_))
        ));
    }

    #[test]
    fn test_price_and_amount() {
        let formatter = formatter();
        assert_eq!(formatter.price_to_precision("BTC/USDT", "50000.126").unwrap(), "50000.13");
        assert_eq!(formatter.amount_to_precision("BTC/USDT", 0.123456789).unwrap(), "0.12345");
        assert_eq!(formatter.price_to_precision("DOGE/USDT", "0.0712345").unwrap(), "0.07123");
        assert_eq!(formatter.amount_to_precision("DOGE/USDT", "100.9").unwrap(), "100");
    }

    #[test]
    fn test_zero_results_are_rejected() {
        let formatter = formatter();
        let err = formatter.amount_to_precision("BTC/USDT", "0.000001").unwrap_err();
        assert!(matches!(err, PrecisionError::InvalidArgument(_)));
        assert!(err.to_string().contains("amount of BTC/USDT"));

        assert!(formatter.price_to_precision("BTC/USDT", "0.001").is_err());
        assert!(formatter.price_to_precision("ODD/USDT", "1").is_err());
    }

    #[test]
    fn test_cost_and_fee() {
        let formatter = formatter();
        assert_eq!(formatter.cost_to_precision("BTC/USDT", "12.3456").unwrap(), "12.34");
        assert_eq!(formatter.fee_to_precision("BTC/USDT", "0.005").unwrap(), "0.01");
        assert_eq!(formatter.cost_to_precision("BTC/USDT", "0.001").unwrap(), "0");
    }

    #[test]
    fn test_currency_to_precision() {
        let formatter = formatter();
        assert_eq!(
            formatter.currency_to_precision("USDT", "1.23456789", None).unwrap(),
            "1.234568"
        );
        assert_eq!(
            formatter.currency_to_precision("USDT", "1.23456789", Some("TRC20")).unwrap(),
            "1.23"
        );
        assert_eq!(
            formatter.currency_to_precision("USDT", "1.23456789", Some("ERC20")).unwrap(),
            "1.234568"
        );
        assert_eq!(
            formatter.currency_to_precision("XYZ", "1.23456789", None).unwrap(),
            "1.23456789"
        );
        assert!(matches!(
            formatter.currency_to_precision("ABC", "1", None),
            Err(PrecisionError::UnknownCurrency(_))
        ));
    }

    #[test]
    fn test_exponent_notation_precisions() {
        let formatter = MarketFormatter::from_json(
            r#"{
                "config": { "precision_mode": "TICK_SIZE" },
                "markets": [{ "symbol": "SHIB/USDT", "price": "1e-8", "amount": "1E2" }]
            }"#,
        )
        .unwrap();
        assert_eq!(formatter.price_to_precision("SHIB/USDT", "0.123456789").unwrap(), "0.12345679");
        assert_eq!(formatter.amount_to_precision("SHIB/USDT", "12345").unwrap(), "12300");
        assert_eq!(formatter.fee_to_precision("SHIB/USDT", "0.000000005").unwrap(), "0.00000001");
    }

    #[test]
    fn test_digit_precision_modes() {
        let mut formatter = MarketFormatter::new(PrecisionConfig {
            precision_mode: SIGNIFICANT_DIGITS,
            padding_mode: PAD_WITH_ZERO,
        });
        formatter.insert_market(MarketPrecision {
            symbol: "ETH/BTC".to_string(),
            price: Some(PrecisionValue::from("4")),
            amount: Some(PrecisionValue::from("3")),
            cost: None,
        });
        assert_eq!(formatter.price_to_precision("ETH/BTC", "0.0512345").unwrap(), "0.05123");
        assert_eq!(formatter.amount_to_precision("ETH/BTC", "2").unwrap(), "2.00");

        let formatter = formatter.with_config(PrecisionConfig::default());
        assert_eq!(formatter.price_to_precision("ETH/BTC", "0.0512345").unwrap(), "0.0512");
    }
}
