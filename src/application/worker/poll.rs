//! One rate-limited pass over the polled subscriptions.

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, warn};

use super::{pause, stopping, ExchangeWorker};
use crate::application::schedule::PollSchedule;
use crate::domain::{
    BalanceEvent, Event, FeedKind, OpenOrdersEvent, OrderBookEvent, Subscription, TickerEvent,
    TradeHistoryEvent, TradesEvent,
};
use crate::error::ExchangeError;

impl ExchangeWorker {
    /// Fetch and publish every polled subscription once.
    ///
    /// Balance subscriptions are collected into a single wallet query issued
    /// after the other items. Every request is followed by the scheduled
    /// delay, so pacing also holds across cycle boundaries.
    pub(super) async fn poll_cycle(&self, shutdown: &mut watch::Receiver<bool>) {
        let schedule = PollSchedule::new(
            &self.exchange,
            self.handle.rate_limits(),
            self.settings.default_poll_interval,
            &self.polling,
        );
        let delay = schedule.delay();
        debug!(
            exchange = %self.exchange,
            requests = schedule.requests,
            delay_ms = delay.map_or(0, millis),
            "Starting poll cycle"
        );

        let mut currencies = BTreeSet::new();
        for subscription in &self.polling {
            if stopping(shutdown) {
                return;
            }
            if subscription.kind() == FeedKind::Balance {
                currencies.insert(subscription.market().base().to_string());
                currencies.insert(subscription.market().counter().to_string());
                continue;
            }

            match self.fetch(subscription).await {
                Ok(event) => self.bus.publish(event),
                Err(e) => {
                    report(&self.exchange, &subscription.to_string(), &e);
                    if e.is_not_available() {
                        if let Some(event) = empty_result(subscription) {
                            self.bus.publish(event);
                        }
                    }
                }
            }

            if !pause(delay, shutdown).await {
                return;
            }
        }

        if currencies.is_empty() || stopping(shutdown) {
            return;
        }
        self.poll_balances(&currencies).await;
        pause(delay, shutdown).await;
    }

    async fn fetch(&self, subscription: &Subscription) -> Result<Event, ExchangeError> {
        let market = subscription.market().clone();
        let pair = market.pair().clone();

        let event = match subscription.kind() {
            FeedKind::Ticker => {
                let ticker = self.handle.market_data().ticker(&pair).await?;
                TickerEvent { market, ticker }.into()
            }
            FeedKind::OrderBook => {
                let depth = self.settings.order_book_depth;
                let mut book = self.handle.market_data().order_book(&pair, depth).await?;
                book.truncate(depth);
                OrderBookEvent { market, book }.into()
            }
            FeedKind::Trades => {
                let trades = self.handle.market_data().trades(&pair).await?;
                TradesEvent { market, trades }.into()
            }
            FeedKind::OpenOrders => {
                let orders = self.clients.trade(&self.exchange)?.open_orders(&pair).await?;
                OpenOrdersEvent { market, orders }.into()
            }
            FeedKind::UserTradeHistory => {
                let limit = self.settings.trade_history_limit;
                let trades = self
                    .clients
                    .trade(&self.exchange)?
                    .trade_history(&pair, limit)
                    .await?;
                TradeHistoryEvent { market, trades }.into()
            }
            FeedKind::Balance => {
                return Err(ExchangeError::Malformed(
                    "balances are fetched in a batch".into(),
                ))
            }
        };
        Ok(event)
    }

    async fn poll_balances(&self, currencies: &BTreeSet<String>) {
        let balances = match self.clients.account(&self.exchange) {
            Ok(account) => account.balances().await,
            Err(e) => Err(e),
        };

        match balances {
            Ok(balances) => {
                for balance in balances
                    .into_iter()
                    .filter(|b| currencies.contains(&b.currency.to_ascii_uppercase()))
                {
                    self.bus.publish(
                        BalanceEvent {
                            exchange: self.exchange.clone(),
                            balance,
                        }
                        .into(),
                    );
                }
            }
            Err(e) => report(&self.exchange, "balances", &e),
        }
    }
}

/// What an unsupported list feed publishes instead: an empty list.
fn empty_result(subscription: &Subscription) -> Option<Event> {
    let market = subscription.market().clone();
    match subscription.kind() {
        FeedKind::Trades => Some(TradesEvent { market, trades: Vec::new() }.into()),
        FeedKind::OpenOrders => Some(OpenOrdersEvent { market, orders: Vec::new() }.into()),
        FeedKind::UserTradeHistory => {
            Some(TradeHistoryEvent { market, trades: Vec::new() }.into())
        }
        FeedKind::Ticker | FeedKind::OrderBook | FeedKind::Balance => None,
    }
}

/// Whole milliseconds in `duration`, saturating.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Log a failed fetch. Unsupported features are expected and only warned.
fn report(exchange: &str, item: &str, error: &ExchangeError) {
    if error.is_not_available() {
        warn!(exchange, item, error = %error, "Feed not available, skipping");
    } else {
        error!(exchange, item, error = %error, "Poll failed, skipping");
    }
}
