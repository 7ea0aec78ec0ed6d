//! Per-feed-kind event bus with latest-value replay.
//!
//! There is one topic per [`FeedKind`]. Each consumer attaches to a topic
//! with a market filter and receives events through a single overwrite slot,
//! so a slow consumer never builds a backlog and never blocks a publisher.
//!
//! Tickers and order books are also cached per market. A new subscriber to
//! either kind is handed the cached value before any live event.

mod cache;
mod receiver;


use std::collections::BTreeMap;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::trace;

use crate::domain::{Event, FeedKind, MarketId};

use cache::LatestValues;
pub use receiver::FeedReceiver;

struct Subscriber {
    market: MarketId,
    slot: watch::Sender<Option<Event>>,
}

#[derive(Default)]
struct Topic {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl Topic {
    fn deliver(&self, event: &Event) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|s| !s.slot.is_closed());

        let mut delivered = 0;
        for subscriber in subscribers.iter().filter(|s| event.concerns(&s.market)) {
            subscriber.slot.send_replace(Some(event.clone()));
            delivered += 1;
        }
        delivered
    }

    fn len(&self) -> usize {
        self.subscribers
            .lock()
            .iter()
            .filter(|s| !s.slot.is_closed())
            .count()
    }
}

/// Point-in-time view of bus occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BusStats {
    /// Live subscribers per topic.
    pub subscribers: BTreeMap<FeedKind, usize>,
    pub cached_tickers: usize,
    pub cached_order_books: usize,
}

impl BusStats {
    #[must_use]
    pub fn total_subscribers(&self) -> usize {
        self.subscribers.values().sum()
    }
}

/// Multiplexed broadcast of normalized events.
pub struct EventBus {
    topics: [Topic; FeedKind::ALL.len()],
    latest: LatestValues,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            topics: Default::default(),
            latest: LatestValues::default(),
        }
    }

    fn topic(&self, kind: FeedKind) -> &Topic {
        &self.topics[kind as usize]
    }

    /// Broadcast `event` to every subscriber whose market filter matches.
    ///
    /// Tickers and order books also replace the cached value for their
    /// market. Never blocks on consumers.
    pub fn publish(&self, event: Event) {
        // Cache before delivering so a concurrent subscribe either sees this
        // value in the cache or is registered in time to receive it live.
        self.latest.record(&event);
        let delivered = self.topic(event.kind()).deliver(&event);
        trace!(kind = %event.kind(), exchange = event.exchange(), delivered, "Event published");
    }

    /// Attach a consumer for `kind` events concerning `market`.
    ///
    /// For cached kinds the receiver starts out holding the latest value for
    /// `market`, if there is one.
    pub fn subscribe(&self, market: MarketId, kind: FeedKind) -> FeedReceiver {
        let topic = self.topic(kind);
        let mut subscribers = topic.subscribers.lock();

        let (tx, rx) = watch::channel(None);
        if kind.is_cached() {
            if let Some(cached) = self.latest.get(&market, kind) {
                // Marks the slot as changed so the first recv() yields it.
                tx.send_replace(Some(cached));
            }
        }

        subscribers.push(Subscriber {
            market: market.clone(),
            slot: tx,
        });
        FeedReceiver::new(market, kind, rx)
    }

    /// Drop the cached `kind` value for `market`. Other feeds of the same
    /// market keep theirs.
    pub fn evict(&self, market: &MarketId, kind: FeedKind) {
        if self.latest.evict(market, kind) {
            trace!(%market, %kind, "Evicted cached value");
        }
    }

    /// The cached value of `kind` for `market`, if any.
    #[must_use]
    pub fn cached(&self, market: &MarketId, kind: FeedKind) -> Option<Event> {
        self.latest.get(market, kind)
    }

    #[must_use]
    pub fn stats(&self) -> BusStats {
        BusStats {
            subscribers: FeedKind::ALL
                .iter()
                .map(|&kind| (kind, self.topic(kind).len()))
                .collect(),
            cached_tickers: self.latest.ticker_count(),
            cached_order_books: self.latest.book_count(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
