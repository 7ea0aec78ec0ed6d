//! Native streaming session for a single exchange.
//!
//! A session owns one connection and one forwarding task per channel. Each
//! task maps raw payloads into [`Event`]s and publishes them on the bus.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::application::bus::EventBus;
use crate::domain::{Event, FeedKind, MarketId, OrderBookEvent, TickerEvent, TradesEvent};
use crate::error::ExchangeError;
use crate::port::exchange::{PayloadStream, StreamChannel, StreamPayload, StreamingMarketData};

/// A live streaming connection and its forwarding tasks.
///
/// Dropping a session stops its forwarding tasks but cannot close the
/// connection; call [`teardown`](Self::teardown) for that.
pub struct StreamingSession {
    exchange: String,
    service: Arc<dyn StreamingMarketData>,
    channels: Vec<StreamChannel>,
    tasks: Vec<JoinHandle<()>>,
    closed: bool,
}

impl StreamingSession {
    /// Connect `service` scoped to exactly `channels` and start forwarding.
    ///
    /// If any channel cannot be opened, tasks already started are stopped and
    /// the connection is closed before the error is returned.
    pub async fn open(
        exchange: &str,
        service: Arc<dyn StreamingMarketData>,
        channels: Vec<StreamChannel>,
        bus: Arc<EventBus>,
    ) -> Result<Self, ExchangeError> {
        service.connect(&channels).await?;

        let mut session = Self {
            exchange: exchange.to_string(),
            service,
            channels: Vec::with_capacity(channels.len()),
            tasks: Vec::with_capacity(channels.len()),
            closed: false,
        };

        for channel in channels {
            let stream = match session.service.channel(&channel) {
                Ok(stream) => stream,
                Err(e) => {
                    if let Err(close) = session.teardown().await {
                        warn!(exchange, error = %close, "Disconnect after failed open also failed");
                    }
                    return Err(e);
                }
            };
            let market = MarketId::from_pair(exchange, channel.pair.clone());
            session.tasks.push(tokio::spawn(forward(
                market,
                channel.kind,
                stream,
                Arc::clone(&bus),
            )));
            session.channels.push(channel);
        }

        info!(exchange, channels = session.channels.len(), "Streaming session opened");
        Ok(session)
    }

    #[must_use]
    pub fn channels(&self) -> &[StreamChannel] {
        &self.channels
    }

    /// Whether the connection has been confirmed closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Stop every channel task, then close the connection.
    ///
    /// Once this returns `Ok` no event from this session reaches the bus and
    /// the connection is fully closed. On `Err` the tasks are already gone
    /// and the session can be torn down again to retry the disconnect.
    pub async fn teardown(&mut self) -> Result<(), ExchangeError> {
        for task in &self.tasks {
            task.abort();
        }
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                if e.is_panic() {
                    error!(exchange = %self.exchange, "Streaming channel task panicked");
                }
            }
        }
        if self.closed {
            return Ok(());
        }
        self.service.disconnect().await?;
        self.closed = true;
        info!(exchange = %self.exchange, "Streaming session closed");
        Ok(())
    }
}

impl Drop for StreamingSession {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        if !self.closed {
            warn!(
                exchange = %self.exchange,
                channels = self.channels.len(),
                "Streaming session dropped without a confirmed disconnect"
            );
        }
    }
}

impl std::fmt::Debug for StreamingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingSession")
            .field("exchange", &self.exchange)
            .field("channels", &self.channels)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

async fn forward(market: MarketId, kind: FeedKind, mut stream: PayloadStream, bus: Arc<EventBus>) {
    while let Some(item) = stream.next().await {
        match item {
            Ok(payload) => match into_event(&market, kind, payload) {
                Some(event) => bus.publish(event),
                None => warn!(%market, %kind, "Payload does not match channel kind, dropped"),
            },
            Err(ExchangeError::Closed) => break,
            Err(e) if e.is_not_available() => {
                warn!(%market, %kind, error = %e, "Streaming feed not available");
            }
            Err(e) => error!(%market, %kind, error = %e, "Streaming channel error"),
        }
    }
    debug!(%market, %kind, "Streaming channel ended");
}

fn into_event(market: &MarketId, kind: FeedKind, payload: StreamPayload) -> Option<Event> {
    let market = market.clone();
    match (kind, payload) {
        (FeedKind::Ticker, StreamPayload::Ticker(ticker)) => {
            Some(TickerEvent { market, ticker }.into())
        }
        (FeedKind::OrderBook, StreamPayload::OrderBook(book)) => {
            Some(OrderBookEvent { market, book }.into())
        }
        (FeedKind::Trades, StreamPayload::Trade(trade)) => Some(
            TradesEvent {
                market,
                trades: vec![trade],
            }
            .into(),
        ),
        _ => None,
    }
}
