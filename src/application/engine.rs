//! The market data engine.
//!
//! Owns the desired-state store, the event bus and one worker per exchange.
//! Callers change what is subscribed through [`Engine::set_desired`] or the
//! [`InterestRegistry`], and consume events through [`Engine::subscribe`].

use std::sync::Arc;

use futures_util::future::join_all;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::application::bus::{BusStats, EventBus, FeedReceiver};
use crate::application::desired::DesiredStateStore;
use crate::application::registry::InterestRegistry;
use crate::application::worker::{ExchangeWorker, WorkerSettings};
use crate::domain::{FeedKind, MarketId, Subscription};
use crate::port::exchange::{ClientFactory, ExchangeDirectory};

pub struct Engine {
    exchanges: Vec<String>,
    store: Arc<DesiredStateStore>,
    bus: Arc<EventBus>,
    registry: InterestRegistry,
    workers: Mutex<Vec<ExchangeWorker>>,
}

impl Engine {
    /// Build one worker for every exchange the directory can resolve.
    ///
    /// Exchanges that fail to resolve are logged and left out; their
    /// subscriptions are ignored like any other unknown exchange.
    pub fn new(
        directory: Arc<dyn ExchangeDirectory>,
        clients: Arc<dyn ClientFactory>,
        settings: WorkerSettings,
    ) -> Self {
        let mut handles = Vec::new();
        for name in directory.exchanges() {
            match directory.get(&name) {
                Ok(handle) => handles.push(handle),
                Err(e) => error!(exchange = %name, error = %e, "Exchange unavailable, skipping"),
            }
        }

        let exchanges: Vec<String> = handles.iter().map(|h| h.name().to_string()).collect();
        let store = Arc::new(DesiredStateStore::new(exchanges.iter().cloned()));
        let bus = Arc::new(EventBus::new());
        let workers = handles
            .into_iter()
            .map(|handle| {
                ExchangeWorker::new(
                    handle,
                    Arc::clone(&clients),
                    Arc::clone(&store),
                    Arc::clone(&bus),
                    settings,
                )
            })
            .collect();

        Self {
            exchanges,
            registry: InterestRegistry::new(Arc::clone(&store)),
            store,
            bus,
            workers: Mutex::new(workers),
        }
    }

    /// Exchanges with a worker.
    #[must_use]
    pub fn exchanges(&self) -> &[String] {
        &self.exchanges
    }

    /// Replace the complete desired state. Exchanges not mentioned are
    /// unsubscribed from everything.
    pub fn set_desired<I>(&self, subscriptions: I)
    where
        I: IntoIterator<Item = Subscription>,
    {
        self.store.set_desired(subscriptions);
    }

    /// Receive `kind` events for `market`.
    pub fn subscribe(&self, market: MarketId, kind: FeedKind) -> FeedReceiver {
        self.bus.subscribe(market, kind)
    }

    #[must_use]
    pub fn registry(&self) -> &InterestRegistry {
        &self.registry
    }

    #[must_use]
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    #[must_use]
    pub fn stats(&self) -> BusStats {
        self.bus.stats()
    }

    /// Run every worker until `shutdown` flips to `true`.
    ///
    /// Returns once all workers have stopped and every transport has been
    /// torn down. A worker that panics is logged and does not affect the
    /// others. Only the first call runs anything.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        let workers = std::mem::take(&mut *self.workers.lock());
        if workers.is_empty() {
            warn!("Engine has no workers to run");
            return;
        }
        info!(exchanges = workers.len(), "Engine started");

        let mut tasks = JoinSet::new();
        for worker in workers {
            tasks.spawn(worker.run(shutdown.clone()));
        }

        let mut stopped = Vec::with_capacity(tasks.len());
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(worker) => stopped.push(worker),
                // The dropped worker aborts its stream tasks; its connection
                // cannot be closed from here.
                Err(e) if e.is_panic() => error!(
                    error = %e,
                    "Exchange worker panicked, its streaming connection was left open"
                ),
                Err(e) => warn!(error = %e, "Exchange worker cancelled"),
            }
        }

        info!("Engine stopping, tearing down subscriptions");
        self.store.clear_all();
        join_all(stopped.into_iter().map(ExchangeWorker::finish)).await;
        info!("Engine stopped");
    }
}
