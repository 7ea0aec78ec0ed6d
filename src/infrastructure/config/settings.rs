//! Application configuration loading and validation.
//!
//! # Example
//!
//! ```no_run
//! use marketbus::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("marketbus.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use super::engine::EngineConfig;
use super::exchange::ExchangeConfig;
use super::logging::LoggingConfig;
use crate::domain::{CurrencyPair, Subscription};
use crate::error::{ConfigError, Result};

/// Main application configuration.
///
/// Every section is optional; an empty file yields a valid configuration
/// with no exchanges.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    /// Simulated exchanges.
    #[serde(default)]
    pub exchanges: Vec<ExchangeConfig>,

    /// Subscriptions requested at startup, `exchange:BASE/COUNTER:kind`.
    #[serde(default)]
    pub subscriptions: Vec<String>,
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML is malformed,
    /// or validation fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    pub fn init_logging(&self) {
        self.logging.init();
    }

    /// Startup subscriptions, parsed.
    ///
    /// # Errors
    ///
    /// Returns an error for the first entry that does not parse. Loaded
    /// configurations have already been checked.
    pub fn startup_subscriptions(&self) -> Result<Vec<Subscription>> {
        self.subscriptions
            .iter()
            .map(|s| s.parse::<Subscription>().map_err(Into::into))
            .collect()
    }

    fn validate(&self) -> Result<()> {
        if !self.logging.level_is_valid() {
            return Err(invalid(
                "logging.level",
                format!("'{}' is not a valid filter", self.logging.level),
            ));
        }

        if self.engine.default_poll_interval_ms == 0 {
            return Err(invalid(
                "default_poll_interval_ms",
                "must be greater than 0".into(),
            ));
        }
        if self.engine.order_book_depth == 0 {
            return Err(invalid("order_book_depth", "must be greater than 0".into()));
        }
        if self.engine.trade_history_limit == 0 {
            return Err(invalid("trade_history_limit", "must be greater than 0".into()));
        }

        let mut names = BTreeSet::new();
        for exchange in &self.exchanges {
            validate_exchange(exchange)?;
            if !names.insert(exchange.name.as_str()) {
                return Err(invalid(
                    "exchanges.name",
                    format!("duplicate exchange '{}'", exchange.name),
                ));
            }
        }

        for subscription in &self.subscriptions {
            if let Err(e) = subscription.parse::<Subscription>() {
                return Err(invalid("subscriptions", e.to_string()));
            }
        }

        Ok(())
    }
}

fn validate_exchange(exchange: &ExchangeConfig) -> Result<()> {
    if exchange.name.trim().is_empty() {
        return Err(ConfigError::MissingField {
            field: "exchanges.name",
        }
        .into());
    }
    if exchange.rate_limit_calls == Some(0) {
        return Err(invalid(
            "rate_limit_calls",
            format!("{}: must be greater than 0", exchange.name),
        ));
    }
    if exchange.rate_limit_period_ms == 0 {
        return Err(invalid(
            "rate_limit_period_ms",
            format!("{}: must be greater than 0", exchange.name),
        ));
    }
    if exchange.tick_ms == 0 {
        return Err(invalid(
            "tick_ms",
            format!("{}: must be greater than 0", exchange.name),
        ));
    }
    if exchange.start_price <= Decimal::ZERO {
        return Err(invalid(
            "start_price",
            format!("{}: must be greater than 0", exchange.name),
        ));
    }
    for market in &exchange.markets {
        if let Err(e) = market.parse::<CurrencyPair>() {
            return Err(invalid("markets", format!("{}: {e}", exchange.name)));
        }
    }
    if let Some((currency, _)) = exchange
        .balances
        .iter()
        .find(|(_, amount)| amount.is_sign_negative())
    {
        return Err(invalid(
            "balances",
            format!("{}: {currency} must not be negative", exchange.name),
        ));
    }
    Ok(())
}

fn invalid(field: &'static str, reason: String) -> crate::error::Error {
    ConfigError::InvalidValue { field, reason }.into()
}
