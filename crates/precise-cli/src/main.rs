use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use precise_core::{
    decimal_to_precision, string_add, string_div, string_max, string_min, string_mod, string_mul,
    string_sub, CountingMode, MarketFormatter, PaddingMode, PrecisionConfig, RoundingMode,
};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Parser)]
#[command(name = "precise")]
#[command(about = "Exact decimal formatting for exchange prices, amounts and fees")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Format a single number
    Format {
        /// Number to format (plain decimal string)
        #[arg(allow_hyphen_values = true)]
        value: String,
        /// Digit count, or step size with TICK_SIZE
        #[arg(long, allow_hyphen_values = true)]
        precision: String,
        #[arg(long, default_value = "ROUND")]
        rounding: RoundingMode,
        #[arg(long, default_value = "DECIMAL_PLACES")]
        counting: CountingMode,
        #[arg(long, default_value = "NO_PADDING")]
        padding: PaddingMode,
    },
    /// Exact arithmetic on two decimal strings
    Calc {
        #[arg(allow_hyphen_values = true)]
        a: String,
        op: Op,
        #[arg(allow_hyphen_values = true)]
        b: String,
        /// Fractional digits kept by `div`
        #[arg(long)]
        scale: Option<u32>,
    },
    /// Apply a market's precision from a catalog file
    Market {
        /// Catalog JSON file
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        symbol: String,
        #[command(flatten)]
        field: MarketField,
        #[arg(long)]
        counting: Option<CountingMode>,
        #[arg(long)]
        padding: Option<PaddingMode>,
    },
    /// Apply a currency's precision from a catalog file
    Currency {
        /// Catalog JSON file
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        code: String,
        #[arg(long, allow_hyphen_values = true)]
        value: String,
        /// Network whose precision overrides the currency's
        #[arg(long)]
        network: Option<String>,
        #[arg(long)]
        counting: Option<CountingMode>,
        #[arg(long)]
        padding: Option<PaddingMode>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Min,
    Max,
}

#[derive(clap::Args)]
#[group(required = true, multiple = false)]
struct MarketField {
    #[arg(long, allow_hyphen_values = true)]
    price: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    amount: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    cost: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    fee: Option<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output = execute(cli.command)?;
    println!("{}", output);
    Ok(())
}

fn load_formatter(
    path: &Path,
    counting: Option<CountingMode>,
    padding: Option<PaddingMode>,
) -> anyhow::Result<MarketFormatter> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;
    let formatter = MarketFormatter::from_json(&json)
        .with_context(|| format!("Failed to parse catalog {}", path.display()))?;

    let defaults = formatter.config();
    let config = PrecisionConfig {
        precision_mode: counting.unwrap_or(defaults.precision_mode),
        padding_mode: padding.unwrap_or(defaults.padding_mode),
    };
    debug!(
        "Loaded catalog {} ({}, {})",
        path.display(),
        config.precision_mode,
        config.padding_mode
    );
    Ok(formatter.with_config(config))
}

fn execute(command: Commands) -> anyhow::Result<String> {
    match command {
        Commands::Format {
            value,
            precision,
            rounding,
            counting,
            padding,
        } => decimal_to_precision(value.as_str(), rounding, precision.as_str(), counting, padding)
            .with_context(|| format!("Failed to format {}", value)),

        Commands::Calc { a, op, b, scale } => {
            let result = match op {
                Op::Add => string_add(&a, &b),
                Op::Sub => string_sub(&a, &b),
                Op::Mul => string_mul(&a, &b),
                Op::Div => string_div(&a, &b, scale),
                Op::Mod => string_mod(&a, &b),
                Op::Min => string_min(&a, &b),
                Op::Max => string_max(&a, &b),
            };
            result.with_context(|| format!("Failed to compute {} {:?} {}", a, op, b))
        }

        Commands::Market {
            catalog,
            symbol,
            field,
            counting,
            padding,
        } => {
            let formatter = load_formatter(&catalog, counting, padding)?;
            let result = if let Some(price) = field.price {
                formatter.price_to_precision(&symbol, price)
            } else if let Some(amount) = field.amount {
                formatter.amount_to_precision(&symbol, amount)
            } else if let Some(cost) = field.cost {
                formatter.cost_to_precision(&symbol, cost)
            } else if let Some(fee) = field.fee {
                formatter.fee_to_precision(&symbol, fee)
            } else {
                anyhow::bail!("One of --price, --amount, --cost or --fee is required");
            };
            result.with_context(|| format!("Failed to apply precision of {}", symbol))
        }

        Commands::Currency {
            catalog,
            code,
            value,
            network,
            counting,
            padding,
        } => {
            let formatter = load_formatter(&catalog, counting, padding)?;
            formatter
                .currency_to_precision(&code, value, network.as_deref())
                .with_context(|| format!("Failed to apply precision of {}", code))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use precise_core::{SIGNIFICANT_DIGITS, TICK_SIZE};

    fn write_catalog(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("precise-cli-{}-{}.json", name, std::process::id()));
        let json = serde_json::json!({
            "config": { "precision_mode": "TICK_SIZE" },
            "markets": [{ "symbol": "BTC/USDT", "price": "0.01", "amount": "0.0001" }],
            "currencies": [{ "code": "USDT", "precision": "0.000001", "networks": { "TRC20": "0.01" } }]
        });
        std::fs::write(&path, json.to_string()).unwrap();
        path
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "precise", "format", "-1.005", "--precision", "2", "--counting", "significant_digits",
        ])
        .unwrap();
        match cli.command {
            Commands::Format { value, counting, .. } => {
                assert_eq!(value, "-1.005");
                assert_eq!(counting, SIGNIFICANT_DIGITS);
            }
            _ => panic!("expected format"),
        }

        assert!(Cli::try_parse_from(["precise", "format", "1", "--precision", "2", "--rounding", "UP"]).is_err());
        assert!(Cli::try_parse_from([
            "precise", "market", "--catalog", "c.json", "--symbol", "X", "--price", "1", "--fee", "2"
        ])
        .is_err());
    }

    #[test]
    fn test_format() {
        let output = execute(Commands::Format {
            value: "165".to_string(),
            precision: "110".to_string(),
            rounding: RoundingMode::Round,
            counting: TICK_SIZE,
            padding: PaddingMode::NoPadding,
        })
        .unwrap();
        assert_eq!(output, "220");
    }

    #[test]
    fn test_calc() {
        let calc = |a: &str, op, b: &str, scale| {
            execute(Commands::Calc {
                a: a.to_string(),
                op,
                b: b.to_string(),
                scale,
            })
        };
        assert_eq!(calc("0.1", Op::Add, "0.2", None).unwrap(), "0.3");
        assert_eq!(calc("1", Op::Div, "3", Some(4)).unwrap(), "0.3333");
        assert_eq!(calc("-5", Op::Max, "2", None).unwrap(), "2");
        let err = calc("1", Op::Div, "0", None).unwrap_err();
        assert!(format!("{:#}", err).contains("division by zero"));
    }

    #[test]
    fn test_market_and_currency() {
        let path = write_catalog("market");
        let output = execute(Commands::Market {
            catalog: path.clone(),
            symbol: "BTC/USDT".to_string(),
            field: MarketField {
                price: None,
                amount: Some("0.123456".to_string()),
                cost: None,
                fee: None,
            },
            counting: None,
            padding: Some(PaddingMode::PadWithZero),
        })
        .unwrap();
        assert_eq!(output, "0.1234");

        let output = execute(Commands::Currency {
            catalog: path.clone(),
            code: "USDT".to_string(),
            value: "1.23456789".to_string(),
            network: Some("TRC20".to_string()),
            counting: None,
            padding: None,
        })
        .unwrap();
        assert_eq!(output, "1.23");

        let err = execute(Commands::Market {
            catalog: path.clone(),
            symbol: "ETH/USDT".to_string(),
            field: MarketField {
                price: Some("1".to_string()),
                amount: None,
                cost: None,
                fee: None,
            },
            counting: None,
            padding: None,
        })
        .unwrap_err();
        assert!(format!("{:#}", err).contains("market not found"));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_catalog() {
        let err = execute(Commands::Currency {
            catalog: PathBuf::from("/nonexistent/catalog.json"),
            code: "USDT".to_string(),
            value: "1".to_string(),
            network: None,
            counting: None,
            padding: None,
        })
        .unwrap_err();
        assert!(err.to_string().contains("Failed to read catalog"));
    }
}
