//! Market identifier types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// Currency pair traded on an exchange, e.g. `BTC/USD`.
///
/// Currency codes are normalised to upper case on construction so that
/// `btc/usd` and `BTC/USD` route to the same market.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurrencyPair {
    base: String,
    counter: String,
}

impl CurrencyPair {
    /// Create a new pair from base and counter currency codes.
    pub fn new(base: impl Into<String>, counter: impl Into<String>) -> Self {
        Self {
            base: base.into().to_ascii_uppercase(),
            counter: counter.into().to_ascii_uppercase(),
        }
    }

    /// The base (traded) currency code.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The counter (quote) currency code.
    #[must_use]
    pub fn counter(&self) -> &str {
        &self.counter
    }

    /// True if `currency` is either leg of this pair.
    #[must_use]
    pub fn involves(&self, currency: &str) -> bool {
        self.base.eq_ignore_ascii_case(currency) || self.counter.eq_ignore_ascii_case(currency)
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.counter)
    }
}

impl FromStr for CurrencyPair {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, counter) = s
            .split_once('/')
            .ok_or_else(|| DomainError::InvalidPair(s.to_string()))?;
        let (base, counter) = (base.trim(), counter.trim());
        if base.is_empty() || counter.is_empty() {
            return Err(DomainError::InvalidPair(s.to_string()));
        }
        Ok(Self::new(base, counter))
    }
}

/// Identifies one tradable market: an exchange plus a currency pair.
///
/// Equality on `MarketId` is the routing key for every event in the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarketId {
    exchange: String,
    pair: CurrencyPair,
}

impl MarketId {
    /// Create a market identifier.
    pub fn new(
        exchange: impl Into<String>,
        base: impl Into<String>,
        counter: impl Into<String>,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            pair: CurrencyPair::new(base, counter),
        }
    }

    /// Create a market identifier from an existing pair.
    pub fn from_pair(exchange: impl Into<String>, pair: CurrencyPair) -> Self {
        Self {
            exchange: exchange.into(),
            pair,
        }
    }

    #[must_use]
    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    #[must_use]
    pub fn pair(&self) -> &CurrencyPair {
        &self.pair
    }

    #[must_use]
    pub fn base(&self) -> &str {
        self.pair.base()
    }

    #[must_use]
    pub fn counter(&self) -> &str {
        self.pair.counter()
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.exchange, self.pair)
    }
}

/// Parses the `exchange:BASE/COUNTER` form produced by `Display`.
impl FromStr for MarketId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (exchange, pair) = s
            .split_once(':')
            .ok_or_else(|| DomainError::InvalidMarket(s.to_string()))?;
        let exchange = exchange.trim();
        if exchange.is_empty() {
            return Err(DomainError::InvalidMarket(s.to_string()));
        }
        Ok(Self::from_pair(exchange, pair.parse()?))
    }
}
