//! Builders for domain primitives used across tests.

use rust_decimal::Decimal;

use crate::domain::{Balance, Event, FeedKind, MarketId, Subscription, Ticker, TickerEvent};
use crate::port::exchange::StreamChannel;

/// Parse `exchange:BASE/COUNTER`.
pub fn market(id: &str) -> MarketId {
    id.parse().expect("valid market id")
}

/// Parse `exchange:BASE/COUNTER:kind`.
pub fn sub(id: &str) -> Subscription {
    id.parse().expect("valid subscription")
}

/// Parse several subscriptions.
pub fn subs(ids: &[&str]) -> Vec<Subscription> {
    ids.iter().map(|id| sub(id)).collect()
}

/// The native channel carrying `kind` for `market`.
pub fn channel(market: &MarketId, kind: FeedKind) -> StreamChannel {
    StreamChannel::new(market.pair().clone(), kind)
}

pub fn ticker_event(market: &MarketId, last: Decimal) -> Event {
    TickerEvent {
        market: market.clone(),
        ticker: Ticker::last(last),
    }
    .into()
}

pub fn balance(currency: &str, total: Decimal) -> Balance {
    Balance::new(currency, total, total)
}

/// Last price of a ticker event. Panics on any other kind.
pub fn last_price(event: &Event) -> Decimal {
    match event {
        Event::Ticker(e) => e.ticker.last,
        other => panic!("expected ticker event, got {other:?}"),
    }
}
