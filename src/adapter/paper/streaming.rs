//! Timer-driven streaming for paper exchanges.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use super::market::PaperMarket;
use crate::domain::FeedKind;
use crate::error::ExchangeError;
use crate::port::exchange::{PayloadStream, StreamChannel, StreamPayload, StreamingMarketData};

/// Pushes a fresh payload on every channel each tick.
pub struct PaperStreaming {
    exchange: String,
    market: Arc<PaperMarket>,
    tick: Duration,
    depth: usize,
    channels: Mutex<BTreeSet<StreamChannel>>,
    /// `true` while connected. Channel streams end when it drops to `false`.
    connected: watch::Sender<bool>,
}

impl PaperStreaming {
    pub fn new(exchange: &str, market: Arc<PaperMarket>, tick: Duration, depth: usize) -> Self {
        Self {
            exchange: exchange.to_string(),
            market,
            tick,
            depth,
            channels: Mutex::new(BTreeSet::new()),
            connected: watch::channel(false).0,
        }
    }
}

#[async_trait]
impl StreamingMarketData for PaperStreaming {
    async fn connect(&self, channels: &[StreamChannel]) -> Result<(), ExchangeError> {
        *self.channels.lock() = channels.iter().cloned().collect();
        self.connected.send_replace(true);
        debug!(exchange = %self.exchange, channels = channels.len(), "Paper stream connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ExchangeError> {
        self.channels.lock().clear();
        self.connected.send_replace(false);
        debug!(exchange = %self.exchange, "Paper stream disconnected");
        Ok(())
    }

    fn channel(&self, channel: &StreamChannel) -> Result<PayloadStream, ExchangeError> {
        if !self.channels.lock().contains(channel) {
            return Err(ExchangeError::Transport(format!("{channel} not connected")));
        }

        let market = Arc::clone(&self.market);
        let channel = channel.clone();
        let depth = self.depth;
        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let connected = self.connected.subscribe();
        let exchange = self.exchange.clone();

        let stream = stream::unfold(
            (interval, connected),
            move |(mut interval, mut connected)| {
                let market = Arc::clone(&market);
                let channel = channel.clone();
                let exchange = exchange.clone();
                async move {
                    tokio::select! {
                        _ = interval.tick() => {}
                        () = disconnected(&mut connected) => return None,
                    }
                    let payload = match channel.kind {
                        FeedKind::Ticker => {
                            market.ticker_now(&channel.pair).map(StreamPayload::Ticker)
                        }
                        FeedKind::OrderBook => {
                            market.book_now(&channel.pair, depth).map(StreamPayload::OrderBook)
                        }
                        FeedKind::Trades => {
                            market.trade_now(&channel.pair).map(StreamPayload::Trade)
                        }
                        other => Err(ExchangeError::NotAvailable {
                            exchange,
                            feature: other.as_str(),
                        }),
                    };
                    Some((payload, (interval, connected)))
                }
            },
        );
        Ok(stream.boxed())
    }
}

async fn disconnected(connected: &mut watch::Receiver<bool>) {
    let _ = connected.wait_for(|up| !*up).await;
}
