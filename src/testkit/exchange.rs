//! Mock exchange collaborators.
//!
//! - [`MockDirectory`] / [`MockExchange`] - a directory of scripted exchanges.
//! - [`MockStreaming`] - a streaming service with per-channel push handles and
//!   a connect/disconnect call log.
//! - [`MockClients`] - recording trade and account clients.
//! - [`RequestLog`] - every fetch made against the mocks, with its instant.
//!
//! Timestamps come from `tokio::time::Instant`, so tests running with a
//! paused clock see exact virtual spacing.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::domain::{
    Balance, CurrencyPair, FeedKind, Order, OrderBook, PriceLevel, Side, Ticker, Trade,
};
use crate::error::ExchangeError;
use crate::port::exchange::{
    AccountClient, Capabilities, ClientFactory, ExchangeDirectory, ExchangeHandle,
    MarketDataService, PayloadStream, RateLimit, StreamChannel, StreamPayload,
    StreamingMarketData, TradeClient,
};

type PayloadResult = Result<StreamPayload, ExchangeError>;

// ---------------------------------------------------------------------------
// RequestLog
// ---------------------------------------------------------------------------

/// A single recorded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub at: Instant,
    pub exchange: String,
    /// `"ticker BTC/USD"`, `"balances"`, ...
    pub what: String,
}

/// Shared, append-only log of requests made against the mocks.
#[derive(Debug, Clone, Default)]
pub struct RequestLog {
    inner: Arc<Mutex<Vec<Request>>>,
}

impl RequestLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, exchange: &str, what: String) {
        self.inner.lock().push(Request {
            at: Instant::now(),
            exchange: exchange.to_string(),
            what,
        });
    }

    pub fn requests(&self) -> Vec<Request> {
        self.inner.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of requests whose description starts with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.inner
            .lock()
            .iter()
            .filter(|r| r.what.starts_with(prefix))
            .count()
    }

    /// Gaps between consecutive requests.
    pub fn gaps(&self) -> Vec<Duration> {
        let requests = self.inner.lock();
        requests
            .windows(2)
            .map(|w| w[1].at.duration_since(w[0].at))
            .collect()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

// ---------------------------------------------------------------------------
// MockStreaming
// ---------------------------------------------------------------------------

/// A call made on [`MockStreaming`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamCall {
    Connect(Vec<StreamChannel>),
    Disconnect,
}

/// Streaming service whose channels are fed by the test.
#[derive(Default)]
pub struct MockStreaming {
    calls: Mutex<Vec<StreamCall>>,
    senders: Mutex<HashMap<StreamChannel, mpsc::UnboundedSender<PayloadResult>>>,
    receivers: Mutex<HashMap<StreamChannel, mpsc::UnboundedReceiver<PayloadResult>>>,
    connect_failures: Mutex<VecDeque<ExchangeError>>,
    disconnect_failures: Mutex<VecDeque<ExchangeError>>,
    disconnect_delay: Mutex<Option<Duration>>,
}

impl MockStreaming {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `connect` with `error`.
    pub fn fail_next_connect(&self, error: ExchangeError) {
        self.connect_failures.lock().push_back(error);
    }

    /// Fail the next `disconnect` with `error`.
    pub fn fail_next_disconnect(&self, error: ExchangeError) {
        self.disconnect_failures.lock().push_back(error);
    }

    /// Make `disconnect` take `delay` before the connection counts as closed.
    pub fn set_disconnect_delay(&self, delay: Duration) {
        *self.disconnect_delay.lock() = Some(delay);
    }

    /// Push `item` onto a connected channel. Returns `false` if the channel
    /// is not connected or its consumer is gone.
    pub fn push(&self, channel: &StreamChannel, item: PayloadResult) -> bool {
        self.senders
            .lock()
            .get(channel)
            .is_some_and(|tx| tx.send(item).is_ok())
    }

    pub fn calls(&self) -> Vec<StreamCall> {
        self.calls.lock().clone()
    }

    pub fn connect_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, StreamCall::Connect(_)))
            .count()
    }

    pub fn disconnect_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, StreamCall::Disconnect))
            .count()
    }

    /// Channels of the live connection, empty when disconnected.
    pub fn connected_channels(&self) -> Vec<StreamChannel> {
        let mut channels: Vec<_> = self.senders.lock().keys().cloned().collect();
        channels.sort();
        channels
    }
}

#[async_trait]
impl StreamingMarketData for MockStreaming {
    async fn connect(&self, channels: &[StreamChannel]) -> Result<(), ExchangeError> {
        self.calls.lock().push(StreamCall::Connect(channels.to_vec()));
        if let Some(e) = self.connect_failures.lock().pop_front() {
            return Err(e);
        }

        let mut senders = self.senders.lock();
        let mut receivers = self.receivers.lock();
        for channel in channels {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.insert(channel.clone(), tx);
            receivers.insert(channel.clone(), rx);
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ExchangeError> {
        let delay = *self.disconnect_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.senders.lock().clear();
        self.receivers.lock().clear();
        self.calls.lock().push(StreamCall::Disconnect);
        match self.disconnect_failures.lock().pop_front() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn channel(&self, channel: &StreamChannel) -> Result<PayloadStream, ExchangeError> {
        let rx = self
            .receivers
            .lock()
            .remove(channel)
            .ok_or_else(|| ExchangeError::Transport(format!("{channel} not connected")))?;
        Ok(stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) })
            .boxed())
    }
}

// ---------------------------------------------------------------------------
// MockMarketData
// ---------------------------------------------------------------------------

/// Public market data with scripted prices and failures.
pub struct MockMarketData {
    exchange: String,
    log: RequestLog,
    prices: Mutex<HashMap<CurrencyPair, Decimal>>,
    failures: Mutex<HashMap<(CurrencyPair, FeedKind), ExchangeError>>,
}

impl MockMarketData {
    pub fn new(exchange: &str, log: RequestLog) -> Self {
        Self {
            exchange: exchange.to_string(),
            log,
            prices: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_price(&self, pair: CurrencyPair, price: Decimal) {
        self.prices.lock().insert(pair, price);
    }

    /// Make every fetch of `kind` on `pair` fail with `error`.
    pub fn fail(&self, pair: CurrencyPair, kind: FeedKind, error: ExchangeError) {
        self.failures.lock().insert((pair, kind), error);
    }

    fn check(&self, pair: &CurrencyPair, kind: FeedKind) -> Result<(), ExchangeError> {
        self.log.record(&self.exchange, format!("{kind} {pair}"));
        match self.failures.lock().get(&(pair.clone(), kind)) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn price(&self, pair: &CurrencyPair) -> Decimal {
        self.prices.lock().get(pair).copied().unwrap_or(dec!(100))
    }
}

#[async_trait]
impl MarketDataService for MockMarketData {
    async fn ticker(&self, pair: &CurrencyPair) -> Result<Ticker, ExchangeError> {
        self.check(pair, FeedKind::Ticker)?;
        Ok(Ticker::last(self.price(pair)))
    }

    async fn order_book(
        &self,
        pair: &CurrencyPair,
        depth: usize,
    ) -> Result<OrderBook, ExchangeError> {
        self.check(pair, FeedKind::OrderBook)?;
        let mid = self.price(pair);
        let bids = (1..=depth as i64 + 5)
            .map(|i| PriceLevel::new(mid - Decimal::from(i), dec!(1)))
            .collect();
        let asks = (1..=depth as i64 + 5)
            .map(|i| PriceLevel::new(mid + Decimal::from(i), dec!(1)))
            .collect();
        Ok(OrderBook::new(bids, asks))
    }

    async fn trades(&self, pair: &CurrencyPair) -> Result<Vec<Trade>, ExchangeError> {
        self.check(pair, FeedKind::Trades)?;
        Ok(vec![trade("t-1", self.price(pair))])
    }
}

fn trade(id: &str, price: Decimal) -> Trade {
    Trade {
        id: id.to_string(),
        side: Side::Buy,
        price,
        amount: dec!(1),
        timestamp: DateTime::<Utc>::default(),
    }
}

// ---------------------------------------------------------------------------
// MockExchange / MockDirectory
// ---------------------------------------------------------------------------

/// One scripted exchange.
pub struct MockExchange {
    name: String,
    market_data: Arc<MockMarketData>,
    streaming: Option<Arc<MockStreaming>>,
    rate_limits: Mutex<Result<Option<Vec<RateLimit>>, ExchangeError>>,
}

impl MockExchange {
    /// A polling-only exchange without published rate limits.
    pub fn polling(name: &str, log: &RequestLog) -> Self {
        Self {
            name: name.to_string(),
            market_data: Arc::new(MockMarketData::new(name, log.clone())),
            streaming: None,
            rate_limits: Mutex::new(Ok(None)),
        }
    }

    /// An exchange with a native streaming service.
    pub fn streaming(name: &str, log: &RequestLog) -> Self {
        Self {
            streaming: Some(Arc::new(MockStreaming::new())),
            ..Self::polling(name, log)
        }
    }

    pub fn with_rate_limits(self, limits: Vec<RateLimit>) -> Self {
        *self.rate_limits.lock() = Ok(Some(limits));
        self
    }

    pub fn with_rate_limit_error(self, error: ExchangeError) -> Self {
        *self.rate_limits.lock() = Err(error);
        self
    }

    pub fn mock_market_data(&self) -> &Arc<MockMarketData> {
        &self.market_data
    }

    /// The streaming mock. Panics on a polling-only exchange.
    pub fn mock_streaming(&self) -> &Arc<MockStreaming> {
        self.streaming
            .as_ref()
            .expect("exchange was built without streaming")
    }
}

impl ExchangeHandle for MockExchange {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        match &self.streaming {
            Some(s) => Capabilities::with_streaming(Arc::clone(s) as Arc<dyn StreamingMarketData>),
            None => Capabilities::polling_only(),
        }
    }

    fn market_data(&self) -> Arc<dyn MarketDataService> {
        Arc::clone(&self.market_data) as Arc<dyn MarketDataService>
    }

    fn rate_limits(&self) -> Result<Option<Vec<RateLimit>>, ExchangeError> {
        self.rate_limits.lock().clone()
    }
}

/// Directory over a fixed set of mock exchanges.
#[derive(Default)]
pub struct MockDirectory {
    exchanges: BTreeMap<String, Arc<MockExchange>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, exchange: MockExchange) -> Self {
        self.exchanges
            .insert(exchange.name.clone(), Arc::new(exchange));
        self
    }

    /// The mock behind `name`. Panics if unknown.
    pub fn exchange(&self, name: &str) -> Arc<MockExchange> {
        Arc::clone(&self.exchanges[name])
    }
}

impl ExchangeDirectory for MockDirectory {
    fn exchanges(&self) -> Vec<String> {
        self.exchanges.keys().cloned().collect()
    }

    fn get(&self, name: &str) -> Result<Arc<dyn ExchangeHandle>, ExchangeError> {
        self.exchanges
            .get(name)
            .map(|e| Arc::clone(e) as Arc<dyn ExchangeHandle>)
            .ok_or_else(|| ExchangeError::UnknownExchange(name.to_string()))
    }
}

// ---------------------------------------------------------------------------
// MockClients
// ---------------------------------------------------------------------------

/// Recording trade and account clients, shared across exchanges.
pub struct MockClients {
    log: RequestLog,
    balances: Mutex<Vec<Balance>>,
    orders: Mutex<Vec<Order>>,
    unavailable: Mutex<Option<&'static str>>,
}

impl MockClients {
    pub fn new(log: &RequestLog) -> Self {
        Self {
            log: log.clone(),
            balances: Mutex::new(Vec::new()),
            orders: Mutex::new(Vec::new()),
            unavailable: Mutex::new(None),
        }
    }

    pub fn with_balances(self, balances: Vec<Balance>) -> Self {
        *self.balances.lock() = balances;
        self
    }

    pub fn with_orders(self, orders: Vec<Order>) -> Self {
        *self.orders.lock() = orders;
        self
    }

    /// Report `feature` as not available on every exchange.
    pub fn unavailable(self, feature: &'static str) -> Self {
        *self.unavailable.lock() = Some(feature);
        self
    }

    fn check(&self, exchange: &str, feature: &'static str) -> Result<(), ExchangeError> {
        match *self.unavailable.lock() {
            Some(f) if f == feature => Err(ExchangeError::NotAvailable {
                exchange: exchange.to_string(),
                feature,
            }),
            _ => Ok(()),
        }
    }
}

struct RecordingTrade {
    exchange: String,
    clients: Arc<MockClients>,
}

#[async_trait]
impl TradeClient for RecordingTrade {
    async fn open_orders(&self, pair: &CurrencyPair) -> Result<Vec<Order>, ExchangeError> {
        self.clients
            .log
            .record(&self.exchange, format!("{} {pair}", FeedKind::OpenOrders));
        self.clients.check(&self.exchange, "open orders")?;
        Ok(self.clients.orders.lock().clone())
    }

    async fn trade_history(
        &self,
        pair: &CurrencyPair,
        limit: usize,
    ) -> Result<Vec<Trade>, ExchangeError> {
        self.clients.log.record(
            &self.exchange,
            format!("{} {pair}", FeedKind::UserTradeHistory),
        );
        self.clients.check(&self.exchange, "trade history")?;
        Ok((0..limit.min(3))
            .map(|i| trade(&format!("u-{i}"), dec!(100)))
            .collect())
    }
}

struct RecordingAccount {
    exchange: String,
    clients: Arc<MockClients>,
}

#[async_trait]
impl AccountClient for RecordingAccount {
    async fn balances(&self) -> Result<Vec<Balance>, ExchangeError> {
        self.clients.log.record(&self.exchange, "balances".to_string());
        self.clients.check(&self.exchange, "balances")?;
        Ok(self.clients.balances.lock().clone())
    }
}

/// Hands out clients backed by a shared [`MockClients`].
pub struct MockClientFactory {
    clients: Arc<MockClients>,
}

impl MockClientFactory {
    pub fn new(clients: MockClients) -> Self {
        Self {
            clients: Arc::new(clients),
        }
    }
}

impl ClientFactory for MockClientFactory {
    fn trade(&self, exchange: &str) -> Result<Arc<dyn TradeClient>, ExchangeError> {
        Ok(Arc::new(RecordingTrade {
            exchange: exchange.to_string(),
            clients: Arc::clone(&self.clients),
        }))
    }

    fn account(&self, exchange: &str) -> Result<Arc<dyn AccountClient>, ExchangeError> {
        Ok(Arc::new(RecordingAccount {
            exchange: exchange.to_string(),
            clients: Arc::clone(&self.clients),
        }))
    }
}
