//! Consumer side of the event bus.

use tokio::sync::watch;

use crate::domain::{Event, FeedKind, MarketId};

/// A consumer's filtered view of one topic.
///
/// Backed by a single overwrite slot: a reader that falls behind only ever
/// sees the most recent unconsumed event for its market, never a backlog.
pub struct FeedReceiver {
    market: MarketId,
    kind: FeedKind,
    slot: watch::Receiver<Option<Event>>,
}

impl FeedReceiver {
    pub(crate) fn new(
        market: MarketId,
        kind: FeedKind,
        slot: watch::Receiver<Option<Event>>,
    ) -> Self {
        Self { market, kind, slot }
    }

    #[must_use]
    pub fn market(&self) -> &MarketId {
        &self.market
    }

    #[must_use]
    pub fn kind(&self) -> FeedKind {
        self.kind
    }

    /// Wait for the next unconsumed event.
    ///
    /// Returns `None` once the bus has been dropped and nothing is left
    /// to read.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            if self.slot.changed().await.is_err() {
                return None;
            }
            if let Some(event) = self.slot.borrow_and_update().clone() {
                return Some(event);
            }
        }
    }

    /// Take the unconsumed event, if any, without waiting.
    pub fn try_recv(&mut self) -> Option<Event> {
        match self.slot.has_changed() {
            Ok(true) => self.slot.borrow_and_update().clone(),
            _ => None,
        }
    }
}

impl std::fmt::Debug for FeedReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedReceiver")
            .field("market", &self.market)
            .field("kind", &self.kind)
            .finish()
    }
}
