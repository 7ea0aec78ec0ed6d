//! Per-exchange pending subscription slots.
//!
//! Callers overwrite the desired set at any time; the owning worker takes it
//! at its next reconciliation point. Rapid successive updates coalesce into
//! whichever was written last.

use std::collections::{BTreeSet, HashMap};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::domain::Subscription;

#[derive(Default)]
struct Slot {
    pending: Mutex<Option<BTreeSet<Subscription>>>,
    written: Notify,
}

impl Slot {
    fn write(&self, set: BTreeSet<Subscription>) {
        *self.pending.lock() = Some(set);
        self.written.notify_one();
    }
}

/// Pending desired state, one slot per known exchange.
pub struct DesiredStateStore {
    slots: HashMap<String, Slot>,
}

impl DesiredStateStore {
    /// Create a store with an empty slot for each exchange name.
    pub fn new<I, S>(exchanges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            slots: exchanges
                .into_iter()
                .map(|name| (name.into(), Slot::default()))
                .collect(),
        }
    }

    /// Replace the desired state of every known exchange.
    ///
    /// Exchanges absent from `subscriptions` receive an empty set, which
    /// unsubscribes everything on their next reconciliation. Subscriptions
    /// naming an unknown exchange are dropped.
    pub fn set_desired<I>(&self, subscriptions: I)
    where
        I: IntoIterator<Item = Subscription>,
    {
        let mut partitioned: HashMap<&str, BTreeSet<Subscription>> = self
            .slots
            .keys()
            .map(|name| (name.as_str(), BTreeSet::new()))
            .collect();

        for subscription in subscriptions {
            match partitioned.get_mut(subscription.exchange()) {
                Some(set) => {
                    set.insert(subscription);
                }
                None => warn!(
                    exchange = subscription.exchange(),
                    %subscription,
                    "Ignoring subscription for unknown exchange"
                ),
            }
        }

        for (exchange, set) in partitioned {
            debug!(exchange, subscriptions = set.len(), "Desired state updated");
            if let Some(slot) = self.slots.get(exchange) {
                slot.write(set);
            }
        }
    }

    /// Take the pending set for `exchange`, leaving the slot empty.
    pub fn take(&self, exchange: &str) -> Option<BTreeSet<Subscription>> {
        self.slots.get(exchange).and_then(|slot| slot.pending.lock().take())
    }

    /// Put `set` back into the slot unless a newer update has landed.
    ///
    /// Returns `true` if the set was restored. Does not wake the worker; the
    /// restored set is retried on its next loop.
    pub fn restore_if_empty(&self, exchange: &str, set: BTreeSet<Subscription>) -> bool {
        let Some(slot) = self.slots.get(exchange) else {
            return false;
        };
        let mut pending = slot.pending.lock();
        if pending.is_some() {
            return false;
        }
        *pending = Some(set);
        true
    }

    /// Request an empty desired state on every exchange.
    pub fn clear_all(&self) {
        for slot in self.slots.values() {
            slot.write(BTreeSet::new());
        }
    }

    /// Whether `exchange` has an update waiting.
    #[must_use]
    pub fn has_pending(&self, exchange: &str) -> bool {
        self.slots
            .get(exchange)
            .is_some_and(|slot| slot.pending.lock().is_some())
    }

    /// Resolve once `set_desired` or `clear_all` has written to `exchange`.
    ///
    /// A write that happened since the last call resolves immediately.
    pub async fn written(&self, exchange: &str) {
        match self.slots.get(exchange) {
            Some(slot) => slot.written.notified().await,
            None => std::future::pending().await,
        }
    }

    pub fn exchanges(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }
}
