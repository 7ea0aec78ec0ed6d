//! Per-exchange control loop.
//!
//! Each exchange gets one worker. The worker alternates between applying the
//! latest desired state (reconcile) and one rate-limited pass over its polled
//! subscriptions (poll cycle):
//!
//! ```text
//! Idle -> Reconciling -> Polling -> Idle -> ...
//! ```
//!
//! Active transport sets and the streaming session are owned by the worker
//! and only touched from its own task.

mod poll;
mod reconcile;

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::application::bus::EventBus;
use crate::application::desired::DesiredStateStore;
use crate::application::session::StreamingSession;
use crate::domain::Subscription;
use crate::port::exchange::{ClientFactory, ExchangeHandle};

/// Default order book depth requested when polling.
pub const DEFAULT_ORDER_BOOK_DEPTH: usize = 20;

/// Default number of user trades requested when polling trade history.
pub const DEFAULT_TRADE_HISTORY_LIMIT: usize = 20;

/// Tunables shared by every worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Poll interval used when an exchange publishes no rate limits.
    pub default_poll_interval: Duration,
    pub order_book_depth: usize,
    pub trade_history_limit: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            default_poll_interval: Duration::from_secs(1),
            order_book_depth: DEFAULT_ORDER_BOOK_DEPTH,
            trade_history_limit: DEFAULT_TRADE_HISTORY_LIMIT,
        }
    }
}

/// Where a worker is in its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Reconciling,
    Polling,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Reconciling => "reconciling",
            Self::Polling => "polling",
        };
        f.write_str(s)
    }
}

/// Control loop for a single exchange.
pub struct ExchangeWorker {
    exchange: String,
    handle: Arc<dyn ExchangeHandle>,
    clients: Arc<dyn ClientFactory>,
    store: Arc<DesiredStateStore>,
    bus: Arc<EventBus>,
    settings: WorkerSettings,
    state: WorkerState,
    streaming: BTreeSet<Subscription>,
    polling: BTreeSet<Subscription>,
    session: Option<StreamingSession>,
}

impl ExchangeWorker {
    pub fn new(
        handle: Arc<dyn ExchangeHandle>,
        clients: Arc<dyn ClientFactory>,
        store: Arc<DesiredStateStore>,
        bus: Arc<EventBus>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            exchange: handle.name().to_string(),
            handle,
            clients,
            store,
            bus,
            settings,
            state: WorkerState::Idle,
            streaming: BTreeSet::new(),
            polling: BTreeSet::new(),
            session: None,
        }
    }

    #[must_use]
    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    #[must_use]
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Subscriptions currently carried by the streaming session.
    #[must_use]
    pub fn streaming(&self) -> &BTreeSet<Subscription> {
        &self.streaming
    }

    /// Subscriptions fetched on each poll cycle.
    #[must_use]
    pub fn polling(&self) -> &BTreeSet<Subscription> {
        &self.polling
    }

    #[must_use]
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    fn transition(&mut self, next: WorkerState) {
        if self.state != next {
            debug!(exchange = %self.exchange, from = %self.state, to = %next, "Worker state");
            self.state = next;
        }
    }

    /// Loop until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// Returns the worker so the engine can run the final teardown once the
    /// desired state has been cleared.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Self {
        info!(exchange = %self.exchange, "Exchange worker started");

        while !stopping(&shutdown) {
            self.transition(WorkerState::Reconciling);
            self.reconcile().await;
            if stopping(&shutdown) {
                break;
            }

            if self.polling.is_empty() {
                self.transition(WorkerState::Idle);
                self.idle(&mut shutdown).await;
                continue;
            }

            self.transition(WorkerState::Polling);
            self.poll_cycle(&mut shutdown).await;
            self.transition(WorkerState::Idle);
        }

        self.transition(WorkerState::Idle);
        info!(exchange = %self.exchange, "Exchange worker stopped");
        self
    }

    /// Apply whatever is pending, then release the worker.
    ///
    /// Called after the store has been cleared, so this tears down every
    /// transport.
    pub async fn finish(mut self) {
        self.transition(WorkerState::Reconciling);
        self.reconcile().await;
        self.transition(WorkerState::Idle);
    }

    /// Nothing to poll: wait for new desired state.
    ///
    /// Wakes on the default poll interval as well, which retries a restored
    /// set after a failed reconciliation.
    async fn idle(&self, shutdown: &mut watch::Receiver<bool>) {
        tokio::select! {
            () = self.store.written(&self.exchange) => {}
            () = wait_for_shutdown(shutdown) => {}
            () = tokio::time::sleep(self.settings.default_poll_interval) => {}
        }
    }
}

impl fmt::Debug for ExchangeWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeWorker")
            .field("exchange", &self.exchange)
            .field("state", &self.state)
            .field("streaming", &self.streaming.len())
            .field("polling", &self.polling.len())
            .finish_non_exhaustive()
    }
}

/// Shutdown requested, or nobody left to request it.
fn stopping(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow() || shutdown.has_changed().is_err()
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Sleep for `delay`, cut short by shutdown. Returns `false` on shutdown.
async fn pause(delay: Option<Duration>, shutdown: &mut watch::Receiver<bool>) -> bool {
    if let Some(delay) = delay {
        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            () = wait_for_shutdown(shutdown) => return false,
        }
    }
    !stopping(shutdown)
}
