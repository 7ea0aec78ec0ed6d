//! Consumer interest tracking.
//!
//! Trading jobs register the feeds they need under their own id. The
//! registry keeps one set per id and pushes the union of every registered
//! set to the desired-state store, so a market stays subscribed until the
//! last interested consumer unregisters.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::application::desired::DesiredStateStore;
use crate::domain::Subscription;

pub struct InterestRegistry {
    store: Arc<DesiredStateStore>,
    interests: Mutex<BTreeMap<String, BTreeSet<Subscription>>>,
}

impl InterestRegistry {
    pub fn new(store: Arc<DesiredStateStore>) -> Self {
        Self {
            store,
            interests: Mutex::new(BTreeMap::new()),
        }
    }

    /// Replace the interest registered under `id`.
    pub fn register<I>(&self, id: impl Into<String>, subscriptions: I)
    where
        I: IntoIterator<Item = Subscription>,
    {
        let id = id.into();
        let mut interests = self.interests.lock();
        let set: BTreeSet<_> = subscriptions.into_iter().collect();
        debug!(consumer = %id, subscriptions = set.len(), "Interest registered");
        interests.insert(id, set);
        self.push(&interests);
    }

    /// Drop the interest registered under `id`. Returns `false` if unknown.
    pub fn unregister(&self, id: &str) -> bool {
        let mut interests = self.interests.lock();
        if interests.remove(id).is_none() {
            return false;
        }
        debug!(consumer = id, "Interest unregistered");
        self.push(&interests);
        true
    }

    /// Every subscription some consumer currently needs.
    #[must_use]
    pub fn union(&self) -> BTreeSet<Subscription> {
        union(&self.interests.lock())
    }

    #[must_use]
    pub fn consumers(&self) -> usize {
        self.interests.lock().len()
    }

    // Runs under the interests lock so concurrent updates reach the store in
    // the same order they were applied here.
    fn push(&self, interests: &BTreeMap<String, BTreeSet<Subscription>>) {
        self.store.set_desired(union(interests));
    }
}

fn union(interests: &BTreeMap<String, BTreeSet<Subscription>>) -> BTreeSet<Subscription> {
    interests.values().flatten().cloned().collect()
}
