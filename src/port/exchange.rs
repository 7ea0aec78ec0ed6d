//! Exchange ports consumed by the engine.
//!
//! The engine never talks to an exchange API directly. An
//! [`ExchangeDirectory`] hands out one [`ExchangeHandle`] per exchange, and a
//! [`ClientFactory`] provides the authenticated trade/account clients. Each
//! implementation hides exchange-specific quirks (pagination, pair filters,
//! wallet naming) behind these uniform calls.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::domain::{Balance, CurrencyPair, FeedKind, Order, OrderBook, Ticker, Trade};
use crate::error::ExchangeError;

/// A published exchange rate limit: at most `calls` requests per `period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub calls: u32,
    pub period: Duration,
}

impl RateLimit {
    #[must_use]
    pub const fn new(calls: u32, period: Duration) -> Self {
        Self { calls, period }
    }

    /// Minimum spacing between calls that stays within this limit.
    #[must_use]
    pub fn poll_delay(&self) -> Duration {
        self.period / self.calls.max(1)
    }
}

/// One native streaming channel: a pair and a streamable feed kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamChannel {
    pub pair: CurrencyPair,
    pub kind: FeedKind,
}

impl StreamChannel {
    pub fn new(pair: CurrencyPair, kind: FeedKind) -> Self {
        Self { pair, kind }
    }
}

impl fmt::Display for StreamChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pair, self.kind)
    }
}

/// Raw payload pushed by a streaming channel.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamPayload {
    Ticker(Ticker),
    OrderBook(OrderBook),
    Trade(Trade),
}

/// Stream of payloads for a single channel.
///
/// An `Err` item is a fault on that channel's data; the stream may keep
/// producing after it.
pub type PayloadStream = BoxStream<'static, Result<StreamPayload, ExchangeError>>;

/// Native push-based market data connection.
#[async_trait]
pub trait StreamingMarketData: Send + Sync {
    /// Open the connection scoped to exactly `channels`.
    async fn connect(&self, channels: &[StreamChannel]) -> Result<(), ExchangeError>;

    /// Close the connection. Resolves only once the connection is fully closed.
    async fn disconnect(&self) -> Result<(), ExchangeError>;

    /// Payload stream for a channel previously passed to [`connect`](Self::connect).
    fn channel(&self, channel: &StreamChannel) -> Result<PayloadStream, ExchangeError>;
}

/// What transports an exchange offers, consulted once per reconciliation.
#[derive(Clone, Default)]
pub struct Capabilities {
    streaming: Option<Arc<dyn StreamingMarketData>>,
}

impl Capabilities {
    /// An exchange reachable only through polling.
    #[must_use]
    pub fn polling_only() -> Self {
        Self { streaming: None }
    }

    /// An exchange with a native streaming service.
    #[must_use]
    pub fn with_streaming(service: Arc<dyn StreamingMarketData>) -> Self {
        Self {
            streaming: Some(service),
        }
    }

    #[must_use]
    pub fn streaming(&self) -> Option<&Arc<dyn StreamingMarketData>> {
        self.streaming.as_ref()
    }

    #[must_use]
    pub fn supports_streaming(&self) -> bool {
        self.streaming.is_some()
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("streaming", &self.supports_streaming())
            .finish()
    }
}

/// Public market data fetched on demand.
#[async_trait]
pub trait MarketDataService: Send + Sync {
    async fn ticker(&self, pair: &CurrencyPair) -> Result<Ticker, ExchangeError>;

    /// Order book limited to `depth` levels per side.
    async fn order_book(&self, pair: &CurrencyPair, depth: usize)
        -> Result<OrderBook, ExchangeError>;

    /// Recent public trades.
    async fn trades(&self, pair: &CurrencyPair) -> Result<Vec<Trade>, ExchangeError>;
}

/// Handle to a single exchange.
pub trait ExchangeHandle: Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    fn market_data(&self) -> Arc<dyn MarketDataService>;

    /// Published rate limits. `Ok(None)` when the exchange publishes none.
    fn rate_limits(&self) -> Result<Option<Vec<RateLimit>>, ExchangeError>;
}

/// Enumerates the known exchanges.
pub trait ExchangeDirectory: Send + Sync {
    /// Names of every exchange the engine should run a worker for.
    fn exchanges(&self) -> Vec<String>;

    fn get(&self, name: &str) -> Result<Arc<dyn ExchangeHandle>, ExchangeError>;
}

/// Authenticated order queries.
#[async_trait]
pub trait TradeClient: Send + Sync {
    async fn open_orders(&self, pair: &CurrencyPair) -> Result<Vec<Order>, ExchangeError>;

    /// Most recent user trades on `pair`, at most `limit`.
    async fn trade_history(
        &self,
        pair: &CurrencyPair,
        limit: usize,
    ) -> Result<Vec<Trade>, ExchangeError>;
}

/// Authenticated wallet queries.
#[async_trait]
pub trait AccountClient: Send + Sync {
    /// Every balance in the trading wallet.
    async fn balances(&self) -> Result<Vec<Balance>, ExchangeError>;
}

/// Provides per-exchange authenticated clients.
pub trait ClientFactory: Send + Sync {
    fn trade(&self, exchange: &str) -> Result<Arc<dyn TradeClient>, ExchangeError>;

    fn account(&self, exchange: &str) -> Result<Arc<dyn AccountClient>, ExchangeError>;
}
