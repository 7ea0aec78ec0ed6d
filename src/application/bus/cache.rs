//! Latest-value cache for tickers and order books.

use dashmap::DashMap;

use crate::domain::{Event, FeedKind, MarketId, OrderBookEvent, TickerEvent};

/// Most recent ticker and order book per market.
///
/// Written by worker and stream tasks on publish, read by arbitrary tasks on
/// subscribe. An entry exists only while its market is subscribed; the
/// owning worker evicts it when the subscription is dropped.
#[derive(Default)]
pub(crate) struct LatestValues {
    tickers: DashMap<MarketId, TickerEvent>,
    books: DashMap<MarketId, OrderBookEvent>,
}

impl LatestValues {
    /// Record `event` if its kind is cached. Last write wins.
    pub(crate) fn record(&self, event: &Event) {
        match event {
            Event::Ticker(e) => {
                self.tickers.insert(e.market.clone(), e.clone());
            }
            Event::OrderBook(e) => {
                self.books.insert(e.market.clone(), e.clone());
            }
            _ => {}
        }
    }

    pub(crate) fn get(&self, market: &MarketId, kind: FeedKind) -> Option<Event> {
        match kind {
            FeedKind::Ticker => self.tickers.get(market).map(|e| e.value().clone().into()),
            FeedKind::OrderBook => self.books.get(market).map(|e| e.value().clone().into()),
            _ => None,
        }
    }

    /// Remove the cached `kind` value for `market`, if there is one.
    pub(crate) fn evict(&self, market: &MarketId, kind: FeedKind) -> bool {
        match kind {
            FeedKind::Ticker => self.tickers.remove(market).is_some(),
            FeedKind::OrderBook => self.books.remove(market).is_some(),
            _ => false,
        }
    }

    pub(crate) fn ticker_count(&self) -> usize {
        self.tickers.len()
    }

    pub(crate) fn book_count(&self) -> usize {
        self.books.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BalanceEvent, Balance, OrderBook, Ticker};
    use rust_decimal_macros::dec;

    fn ticker(market: &MarketId, last: rust_decimal::Decimal) -> Event {
        TickerEvent {
            market: market.clone(),
            ticker: Ticker::last(last),
        }
        .into()
    }

    #[test]
    fn last_write_wins() {
        let cache = LatestValues::default();
        let market = MarketId::new("kraken", "BTC", "USD");

        cache.record(&ticker(&market, dec!(1)));
        cache.record(&ticker(&market, dec!(2)));

        assert_eq!(cache.get(&market, FeedKind::Ticker), Some(ticker(&market, dec!(2))));
        assert_eq!(cache.ticker_count(), 1);
    }

    #[test]
    fn uncached_kinds_are_ignored() {
        let cache = LatestValues::default();
        cache.record(&Event::Balance(BalanceEvent {
            exchange: "kraken".into(),
            balance: Balance::new("BTC", dec!(1), dec!(1)),
        }));
        assert_eq!(cache.ticker_count() + cache.book_count(), 0);
    }

    #[test]
    fn evict_removes_only_the_given_feed() {
        let cache = LatestValues::default();
        let market = MarketId::new("kraken", "BTC", "USD");
        cache.record(&ticker(&market, dec!(1)));
        cache.record(&Event::OrderBook(OrderBookEvent {
            market: market.clone(),
            book: OrderBook::default(),
        }));

        assert!(cache.evict(&market, FeedKind::OrderBook));
        assert!(cache.get(&market, FeedKind::OrderBook).is_none());
        assert!(cache.get(&market, FeedKind::Ticker).is_some());
        assert!(!cache.evict(&market, FeedKind::OrderBook));
        assert!(!cache.evict(&market, FeedKind::Trades));
    }
}
