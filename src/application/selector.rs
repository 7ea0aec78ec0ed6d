//! Split a subscription set between streaming and polling transports.

use std::collections::BTreeSet;

use crate::domain::Subscription;
use crate::port::exchange::{Capabilities, StreamChannel};

/// Transport assignment for one exchange. The two sets are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportPlan {
    pub streaming: BTreeSet<Subscription>,
    pub polling: BTreeSet<Subscription>,
}

impl TransportPlan {
    /// Native channels needed to carry the streaming subset.
    #[must_use]
    pub fn channels(&self) -> Vec<StreamChannel> {
        self.streaming
            .iter()
            .map(|s| StreamChannel::new(s.market().pair().clone(), s.kind()))
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streaming.is_empty() && self.polling.is_empty()
    }
}

/// Assign each subscription to a transport.
///
/// With native streaming, streamable feeds go to the streaming subset and
/// the rest are polled. Without it, everything is polled.
#[must_use]
pub fn select(capabilities: &Capabilities, subscriptions: BTreeSet<Subscription>) -> TransportPlan {
    if !capabilities.supports_streaming() {
        return TransportPlan {
            streaming: BTreeSet::new(),
            polling: subscriptions,
        };
    }

    let (streaming, polling) = subscriptions
        .into_iter()
        .partition(|s| s.kind().is_streamable());
    TransportPlan { streaming, polling }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::{FeedKind, MarketId};
    use crate::testkit::exchange::MockStreaming;

    fn subs(kinds: &[FeedKind]) -> BTreeSet<Subscription> {
        kinds
            .iter()
            .map(|&k| Subscription::new(MarketId::new("kraken", "BTC", "USD"), k))
            .collect()
    }

    #[test]
    fn polling_only_exchange_polls_everything() {
        let plan = select(
            &Capabilities::polling_only(),
            subs(&[FeedKind::Ticker, FeedKind::Balance]),
        );

        assert!(plan.streaming.is_empty());
        assert_eq!(plan.polling.len(), 2);
    }

    #[test]
    fn streaming_exchange_streams_market_feeds_only() {
        let caps = Capabilities::with_streaming(Arc::new(MockStreaming::new()));

        let plan = select(
            &caps,
            subs(&[
                FeedKind::Ticker,
                FeedKind::OrderBook,
                FeedKind::Trades,
                FeedKind::OpenOrders,
                FeedKind::UserTradeHistory,
                FeedKind::Balance,
            ]),
        );

        assert_eq!(plan.streaming, subs(&[FeedKind::Ticker, FeedKind::OrderBook, FeedKind::Trades]));
        assert_eq!(
            plan.polling,
            subs(&[FeedKind::OpenOrders, FeedKind::UserTradeHistory, FeedKind::Balance])
        );
        assert!(plan.streaming.is_disjoint(&plan.polling));
    }

    #[test]
    fn channels_follow_streaming_subset() {
        let caps = Capabilities::with_streaming(Arc::new(MockStreaming::new()));
        let plan = select(&caps, subs(&[FeedKind::Ticker, FeedKind::Balance]));

        let channels = plan.channels();

        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].kind, FeedKind::Ticker);
        assert_eq!(channels[0].pair.to_string(), "BTC/USD");
    }
}
