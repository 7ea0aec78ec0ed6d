//! Domain validation errors.
//!
//! Returned when parsing identifiers and subscriptions from their textual
//! form (CLI arguments, configuration files).
//!
//! ```
//! use marketbus::domain::error::DomainError;
//! use marketbus::domain::id::MarketId;
//!
//! let result = "kraken-BTC-USD".parse::<MarketId>();
//! assert!(matches!(result, Err(DomainError::InvalidMarket(_))));
//! ```

use thiserror::Error;

/// Errors raised when a domain value cannot be constructed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Currency pair not in `BASE/COUNTER` form.
    #[error("invalid currency pair '{0}', expected BASE/COUNTER")]
    InvalidPair(String),

    /// Market not in `exchange:BASE/COUNTER` form.
    #[error("invalid market '{0}', expected exchange:BASE/COUNTER")]
    InvalidMarket(String),

    /// Unknown feed kind name.
    #[error("unknown feed kind '{0}'")]
    UnknownFeedKind(String),

    /// Subscription not in `exchange:BASE/COUNTER:kind` form.
    #[error("invalid subscription '{0}', expected exchange:BASE/COUNTER:kind")]
    InvalidSubscription(String),
}
