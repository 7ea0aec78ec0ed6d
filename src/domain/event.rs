//! Canonical market data events.
//!
//! Every transport (streaming channel or poll fetch) produces one of these.
//! Events are transient: they are broadcast, optionally cached, and never
//! persisted.

use serde::{Deserialize, Serialize};

use super::feed::FeedKind;
use super::id::MarketId;
use super::market_data::{Balance, Order, OrderBook, Ticker, Trade};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerEvent {
    pub market: MarketId,
    pub ticker: Ticker,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookEvent {
    pub market: MarketId,
    pub book: OrderBook,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradesEvent {
    pub market: MarketId,
    pub trades: Vec<Trade>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOrdersEvent {
    pub market: MarketId,
    pub orders: Vec<Order>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeHistoryEvent {
    pub market: MarketId,
    pub trades: Vec<Trade>,
}

/// Balance events are keyed by exchange and currency, not by market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceEvent {
    pub exchange: String,
    pub balance: Balance,
}

impl BalanceEvent {
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.balance.currency
    }
}

/// A normalized event, one variant per [`FeedKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Ticker(TickerEvent),
    OrderBook(OrderBookEvent),
    Trades(TradesEvent),
    OpenOrders(OpenOrdersEvent),
    TradeHistory(TradeHistoryEvent),
    Balance(BalanceEvent),
}

impl Event {
    #[must_use]
    pub fn kind(&self) -> FeedKind {
        match self {
            Self::Ticker(_) => FeedKind::Ticker,
            Self::OrderBook(_) => FeedKind::OrderBook,
            Self::Trades(_) => FeedKind::Trades,
            Self::OpenOrders(_) => FeedKind::OpenOrders,
            Self::TradeHistory(_) => FeedKind::UserTradeHistory,
            Self::Balance(_) => FeedKind::Balance,
        }
    }

    /// The originating market, `None` for balance events.
    #[must_use]
    pub fn market(&self) -> Option<&MarketId> {
        match self {
            Self::Ticker(e) => Some(&e.market),
            Self::OrderBook(e) => Some(&e.market),
            Self::Trades(e) => Some(&e.market),
            Self::OpenOrders(e) => Some(&e.market),
            Self::TradeHistory(e) => Some(&e.market),
            Self::Balance(_) => None,
        }
    }

    #[must_use]
    pub fn exchange(&self) -> &str {
        match self {
            Self::Balance(e) => &e.exchange,
            other => other.market().map_or("", MarketId::exchange),
        }
    }

    /// Whether a consumer subscribed to `market` should receive this event.
    ///
    /// Market events match on equality. Balance events match when the
    /// exchange is the same and the currency is either leg of the pair.
    #[must_use]
    pub fn concerns(&self, market: &MarketId) -> bool {
        match self {
            Self::Balance(e) => {
                e.exchange == market.exchange() && market.pair().involves(e.currency())
            }
            other => other.market() == Some(market),
        }
    }
}

impl From<TickerEvent> for Event {
    fn from(e: TickerEvent) -> Self {
        Self::Ticker(e)
    }
}

impl From<OrderBookEvent> for Event {
    fn from(e: OrderBookEvent) -> Self {
        Self::OrderBook(e)
    }
}

impl From<TradesEvent> for Event {
    fn from(e: TradesEvent) -> Self {
        Self::Trades(e)
    }
}

impl From<OpenOrdersEvent> for Event {
    fn from(e: OpenOrdersEvent) -> Self {
        Self::OpenOrders(e)
    }
}

impl From<TradeHistoryEvent> for Event {
    fn from(e: TradeHistoryEvent) -> Self {
        Self::TradeHistory(e)
    }
}

impl From<BalanceEvent> for Event {
    fn from(e: BalanceEvent) -> Self {
        Self::Balance(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn btc_usd() -> MarketId {
        MarketId::new("kraken", "BTC", "USD")
    }

    #[test]
    fn market_event_matches_only_its_market() {
        let event = Event::from(TickerEvent {
            market: btc_usd(),
            ticker: Ticker::last(dec!(50000)),
        });
        assert_eq!(event.kind(), FeedKind::Ticker);
        assert!(event.concerns(&btc_usd()));
        assert!(!event.concerns(&MarketId::new("kraken", "ETH", "USD")));
        assert!(!event.concerns(&MarketId::new("gdax", "BTC", "USD")));
    }

    #[test]
    fn balance_event_matches_either_leg_on_same_exchange() {
        let usd = Event::from(BalanceEvent {
            exchange: "kraken".into(),
            balance: Balance::new("USD", dec!(10), dec!(10)),
        });
        assert!(usd.concerns(&btc_usd()));
        assert!(usd.concerns(&MarketId::new("kraken", "ETH", "USD")));
        assert!(!usd.concerns(&MarketId::new("kraken", "ETH", "BTC")));
        assert!(!usd.concerns(&MarketId::new("gdax", "BTC", "USD")));
        assert_eq!(usd.exchange(), "kraken");
        assert!(usd.market().is_none());
    }
}
