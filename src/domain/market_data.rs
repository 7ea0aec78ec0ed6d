//! Exchange-agnostic market and account data payloads.
//!
//! These are the payloads carried by [`Event`](super::event::Event)s:
//!
//! - [`Ticker`] - last price plus top of book
//! - [`OrderBook`] - depth snapshot, best prices first
//! - [`Trade`] - a public or user trade
//! - [`Order`] - an open limit order
//! - [`Balance`] - wallet balance for one currency
//!
//! # Examples
//!
//! ```
//! use marketbus::domain::market_data::{OrderBook, PriceLevel};
//! use rust_decimal_macros::dec;
//!
//! let book = OrderBook::new(
//!     vec![PriceLevel::new(dec!(100.5), dec!(2))],
//!     vec![PriceLevel::new(dec!(101.0), dec!(1))],
//! );
//!
//! assert_eq!(book.spread(), Some(dec!(0.5)));
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Latest price snapshot for a market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    /// Last traded price.
    pub last: Decimal,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
    /// Rolling 24h base volume, when the exchange reports it.
    pub volume: Option<Decimal>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Ticker {
    /// A ticker carrying only a last price.
    #[must_use]
    pub fn last(last: Decimal) -> Self {
        Self {
            last,
            bid: None,
            ask: None,
            volume: None,
            timestamp: None,
        }
    }
}

/// A single price level in an order book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    price: Decimal,
    amount: Decimal,
}

impl PriceLevel {
    #[must_use]
    pub const fn new(price: Decimal, amount: Decimal) -> Self {
        Self { price, amount }
    }

    #[must_use]
    pub const fn price(&self) -> Decimal {
        self.price
    }

    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }
}

/// Order book snapshot.
///
/// Bids are sorted by price descending, asks ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
    timestamp: Option<DateTime<Utc>>,
}

impl OrderBook {
    #[must_use]
    pub fn new(bids: Vec<PriceLevel>, asks: Vec<PriceLevel>) -> Self {
        Self {
            bids,
            asks,
            timestamp: None,
        }
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    #[must_use]
    pub fn bids(&self) -> &[PriceLevel] {
        &self.bids
    }

    #[must_use]
    pub fn asks(&self) -> &[PriceLevel] {
        &self.asks
    }

    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    #[must_use]
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    #[must_use]
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Best ask minus best bid, if both sides are present.
    #[must_use]
    pub fn spread(&self) -> Option<Decimal> {
        Some(self.best_ask()?.price() - self.best_bid()?.price())
    }

    /// Keep at most `depth` levels on each side.
    pub fn truncate(&mut self, depth: usize) {
        self.bids.truncate(depth);
        self.asks.truncate(depth);
    }
}

/// Order or trade side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

/// An executed trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub side: Side,
    pub price: Decimal,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// An open limit order on the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub side: Side,
    pub limit_price: Decimal,
    pub original_amount: Decimal,
    pub filled_amount: Decimal,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Order {
    /// Amount still resting on the book.
    #[must_use]
    pub fn remaining_amount(&self) -> Decimal {
        self.original_amount - self.filled_amount
    }
}

/// Wallet balance for a single currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub currency: String,
    pub total: Decimal,
    pub available: Decimal,
}

impl Balance {
    pub fn new(currency: impl Into<String>, total: Decimal, available: Decimal) -> Self {
        Self {
            currency: currency.into().to_ascii_uppercase(),
            total,
            available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn spread_requires_both_sides() {
        let book = OrderBook::new(vec![PriceLevel::new(dec!(10), dec!(1))], vec![]);
        assert_eq!(book.spread(), None);
    }

    #[test]
    fn truncate_limits_depth() {
        let levels: Vec<_> = (1..=30)
            .map(|i| PriceLevel::new(Decimal::from(i), dec!(1)))
            .collect();
        let mut book = OrderBook::new(levels.clone(), levels);
        book.truncate(20);
        assert_eq!(book.bids().len(), 20);
        assert_eq!(book.asks().len(), 20);
    }

    #[test]
    fn remaining_amount() {
        let order = Order {
            id: "1".into(),
            side: Side::Buy,
            limit_price: dec!(100),
            original_amount: dec!(2),
            filled_amount: dec!(0.5),
            timestamp: None,
        };
        assert_eq!(order.remaining_amount(), dec!(1.5));
    }

    #[test]
    fn balance_currency_is_upper_case() {
        assert_eq!(Balance::new("btc", dec!(1), dec!(1)).currency, "BTC");
    }
}
