use thiserror::Error;

use crate::domain::error::DomainError;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Errors reported by exchange collaborators.
///
/// The variant decides how the engine reacts: `NotAvailable` is logged at
/// warning and treated as an empty result, everything else is logged at
/// error and the single item is skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("{feature} not available on {exchange}")]
    NotAvailable {
        exchange: String,
        feature: &'static str,
    },

    #[error("unknown exchange: {0}")]
    UnknownExchange(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("stream closed")]
    Closed,
}

impl ExchangeError {
    /// True if the exchange simply does not offer the requested feature.
    #[must_use]
    pub const fn is_not_available(&self) -> bool {
        matches!(self, Self::NotAvailable { .. })
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_convert_transparently() {
        let err: Error = ConfigError::MissingField {
            field: "exchanges.name",
        }
        .into();

        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.to_string(), "missing required field: exchanges.name");
    }

    #[test]
    fn exchange_errors_convert_transparently() {
        let err: Error = ExchangeError::UnknownExchange("binance".into()).into();

        assert!(matches!(err, Error::Exchange(_)));
        assert_eq!(err.to_string(), "unknown exchange: binance");
    }
}
