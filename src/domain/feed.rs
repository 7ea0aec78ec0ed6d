//! Feed kinds and subscriptions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::domain::id::MarketId;

/// The kind of market data requested for a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    Ticker,
    OrderBook,
    Trades,
    OpenOrders,
    UserTradeHistory,
    Balance,
}

impl FeedKind {
    /// Every feed kind, in topic order.
    pub const ALL: [FeedKind; 6] = [
        Self::Ticker,
        Self::OrderBook,
        Self::Trades,
        Self::OpenOrders,
        Self::UserTradeHistory,
        Self::Balance,
    ];

    /// Whether an exchange with native streaming may carry this feed.
    ///
    /// Account data (orders, fills, balances) is always polled.
    #[must_use]
    pub const fn is_streamable(self) -> bool {
        matches!(self, Self::Ticker | Self::OrderBook | Self::Trades)
    }

    /// Whether the latest event of this kind is cached for late subscribers.
    #[must_use]
    pub const fn is_cached(self) -> bool {
        matches!(self, Self::Ticker | Self::OrderBook)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ticker => "ticker",
            Self::OrderBook => "orderbook",
            Self::Trades => "trades",
            Self::OpenOrders => "open_orders",
            Self::UserTradeHistory => "user_trade_history",
            Self::Balance => "balance",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ticker" => Ok(Self::Ticker),
            "orderbook" | "order_book" | "book" => Ok(Self::OrderBook),
            "trades" => Ok(Self::Trades),
            "open_orders" | "orders" => Ok(Self::OpenOrders),
            "user_trade_history" | "history" => Ok(Self::UserTradeHistory),
            "balance" => Ok(Self::Balance),
            other => Err(DomainError::UnknownFeedKind(other.to_string())),
        }
    }
}

/// One requested data feed: a market and a feed kind.
///
/// The unit of desired state. Ordered so that poll cycles visit
/// subscriptions in a stable order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Subscription {
    market: MarketId,
    kind: FeedKind,
}

impl Subscription {
    pub fn new(market: MarketId, kind: FeedKind) -> Self {
        Self { market, kind }
    }

    #[must_use]
    pub fn market(&self) -> &MarketId {
        &self.market
    }

    #[must_use]
    pub fn kind(&self) -> FeedKind {
        self.kind
    }

    #[must_use]
    pub fn exchange(&self) -> &str {
        self.market.exchange()
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.market, self.kind)
    }
}

/// Parses `exchange:BASE/COUNTER:kind`.
impl FromStr for Subscription {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (market, kind) = s
            .rsplit_once(':')
            .ok_or_else(|| DomainError::InvalidSubscription(s.to_string()))?;
        Ok(Self::new(market.parse()?, kind.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_public_market_data_is_streamable() {
        let streamable: Vec<_> = FeedKind::ALL
            .into_iter()
            .filter(|k| k.is_streamable())
            .collect();
        assert_eq!(
            streamable,
            vec![FeedKind::Ticker, FeedKind::OrderBook, FeedKind::Trades]
        );
    }

    #[test]
    fn only_ticker_and_book_are_cached() {
        assert!(FeedKind::Ticker.is_cached());
        assert!(FeedKind::OrderBook.is_cached());
        assert!(!FeedKind::Trades.is_cached());
        assert!(!FeedKind::Balance.is_cached());
    }

    #[test]
    fn parse_subscription() {
        let sub: Subscription = "kraken:btc/usd:ticker".parse().unwrap();
        assert_eq!(sub.market(), &MarketId::new("kraken", "BTC", "USD"));
        assert_eq!(sub.kind(), FeedKind::Ticker);
        assert_eq!(sub.to_string(), "kraken:BTC/USD:ticker");
    }

    #[test]
    fn parse_rejects_unknown_kind() {
        let err = "kraken:BTC/USD:candles".parse::<Subscription>().unwrap_err();
        assert_eq!(err, DomainError::UnknownFeedKind("candles".into()));
    }

    #[test]
    fn feed_kind_aliases() {
        assert_eq!("book".parse::<FeedKind>().unwrap(), FeedKind::OrderBook);
        assert_eq!("ORDERS".parse::<FeedKind>().unwrap(), FeedKind::OpenOrders);
    }
}
