use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use tokio::sync::watch;

use super::*;
use crate::domain::FeedKind;
use crate::error::ExchangeError;
use crate::port::exchange::{RateLimit, StreamPayload};
use crate::testkit::domain::{balance, channel, market, sub, subs, ticker_event};
use crate::testkit::exchange::{
    MockClientFactory, MockClients, MockExchange, RequestLog, StreamCall,
};

struct Fixture {
    worker: ExchangeWorker,
    exchange: Arc<MockExchange>,
    store: Arc<DesiredStateStore>,
    bus: Arc<EventBus>,
    log: RequestLog,
}

fn fixture(build: impl FnOnce(&RequestLog) -> MockExchange) -> Fixture {
    fixture_with_clients(build, |log| MockClients::new(log))
}

fn fixture_with_clients(
    build: impl FnOnce(&RequestLog) -> MockExchange,
    clients: impl FnOnce(&RequestLog) -> MockClients,
) -> Fixture {
    let log = RequestLog::new();
    let exchange = Arc::new(build(&log));
    let store = Arc::new(DesiredStateStore::new([exchange.name().to_string()]));
    let bus = Arc::new(EventBus::new());
    let worker = ExchangeWorker::new(
        Arc::clone(&exchange) as Arc<dyn ExchangeHandle>,
        Arc::new(MockClientFactory::new(clients(&log))),
        Arc::clone(&store),
        Arc::clone(&bus),
        WorkerSettings::default(),
    );
    Fixture {
        worker,
        exchange,
        store,
        bus,
        log,
    }
}

fn running() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

// =============================================================================
// Reconciliation
// =============================================================================

#[tokio::test]
async fn streaming_exchange_streams_ticker_and_polls_nothing() {
    let mut f = fixture(|log| MockExchange::streaming("kraken", log));
    let btc = market("kraken:BTC/USD");

    f.store.set_desired(subs(&["kraken:BTC/USD:ticker"]));
    f.worker.reconcile().await;

    let streaming = f.exchange.mock_streaming();
    assert_eq!(
        streaming.calls(),
        vec![StreamCall::Connect(vec![channel(&btc, FeedKind::Ticker)])]
    );
    assert_eq!(f.worker.streaming().len(), 1);
    assert!(f.worker.polling().is_empty());
    assert!(f.worker.has_session());
}

#[tokio::test]
async fn empty_desired_state_tears_down_and_evicts() {
    let mut f = fixture(|log| MockExchange::streaming("kraken", log));
    let btc = market("kraken:BTC/USD");
    f.store.set_desired(subs(&["kraken:BTC/USD:ticker"]));
    f.worker.reconcile().await;
    f.bus.publish(ticker_event(&btc, dec!(1)));
    assert!(f.bus.cached(&btc, FeedKind::Ticker).is_some());

    f.store.set_desired(Vec::new());
    f.worker.reconcile().await;

    assert_eq!(f.exchange.mock_streaming().disconnect_count(), 1);
    assert!(f.bus.cached(&btc, FeedKind::Ticker).is_none());
    assert!(!f.worker.has_session());
    assert!(f.worker.streaming().is_empty());
}

#[tokio::test]
async fn identical_desired_state_is_ignored() {
    let mut f = fixture(|log| MockExchange::streaming("kraken", log));

    f.store.set_desired(subs(&["kraken:BTC/USD:ticker"]));
    f.worker.reconcile().await;
    f.store.set_desired(subs(&["kraken:BTC/USD:ticker"]));
    f.worker.reconcile().await;

    let streaming = f.exchange.mock_streaming();
    assert_eq!(streaming.connect_count(), 1);
    assert_eq!(streaming.disconnect_count(), 0);
}

#[tokio::test]
async fn polling_change_still_reopens_stream() {
    let mut f = fixture(|log| MockExchange::streaming("kraken", log));

    f.store.set_desired(subs(&["kraken:BTC/USD:ticker"]));
    f.worker.reconcile().await;
    f.store
        .set_desired(subs(&["kraken:BTC/USD:ticker", "kraken:BTC/USD:balance"]));
    f.worker.reconcile().await;

    let streaming = f.exchange.mock_streaming();
    assert_eq!(streaming.connect_count(), 2);
    assert_eq!(streaming.disconnect_count(), 1);
    assert_eq!(f.worker.polling().len(), 1);
}

#[tokio::test]
async fn surviving_market_keeps_its_cache() {
    let mut f = fixture(|log| MockExchange::polling("bitfinex", log));
    let btc = market("bitfinex:BTC/USD");
    let eth = market("bitfinex:ETH/USD");
    f.store.set_desired(subs(&[
        "bitfinex:BTC/USD:ticker",
        "bitfinex:ETH/USD:ticker",
    ]));
    f.worker.reconcile().await;
    f.bus.publish(ticker_event(&btc, dec!(1)));
    f.bus.publish(ticker_event(&eth, dec!(1)));

    f.store.set_desired(subs(&["bitfinex:BTC/USD:ticker"]));
    f.worker.reconcile().await;

    assert!(f.bus.cached(&btc, FeedKind::Ticker).is_some());
    assert!(f.bus.cached(&eth, FeedKind::Ticker).is_none());
}

#[tokio::test(start_paused = true)]
async fn dropped_feed_evicts_only_its_cache() {
    let mut f = fixture(|log| MockExchange::polling("bitfinex", log));
    let btc = market("bitfinex:BTC/USD");
    f.store.set_desired(subs(&[
        "bitfinex:BTC/USD:ticker",
        "bitfinex:BTC/USD:orderbook",
    ]));
    f.worker.reconcile().await;
    let (_tx, mut shutdown) = running();
    f.worker.poll_cycle(&mut shutdown).await;
    assert!(f.bus.cached(&btc, FeedKind::OrderBook).is_some());

    f.store.set_desired(subs(&["bitfinex:BTC/USD:ticker"]));
    f.worker.reconcile().await;

    assert!(
        f.bus.cached(&btc, FeedKind::OrderBook).is_none(),
        "order book of an unsubscribed feed must not be replayed"
    );
    assert!(f.bus.cached(&btc, FeedKind::Ticker).is_some());
    let mut late = f.bus.subscribe(btc, FeedKind::OrderBook);
    assert!(late.try_recv().is_none());
}

#[tokio::test]
async fn failed_teardown_restores_desired_state() {
    let mut f = fixture(|log| MockExchange::streaming("kraken", log));
    f.store.set_desired(subs(&["kraken:BTC/USD:ticker"]));
    f.worker.reconcile().await;

    f.exchange
        .mock_streaming()
        .fail_next_disconnect(ExchangeError::Transport("socket stuck".into()));
    f.store.set_desired(subs(&["kraken:ETH/USD:ticker"]));
    f.worker.reconcile().await;

    assert!(f.store.has_pending("kraken"));
    assert!(f.worker.streaming().contains(&sub("kraken:BTC/USD:ticker")));
    assert!(f.worker.has_session(), "unclosed session is kept for the retry");

    f.worker.reconcile().await;

    assert!(!f.store.has_pending("kraken"));
    assert_eq!(
        f.worker.streaming().iter().cloned().collect::<Vec<_>>(),
        subs(&["kraken:ETH/USD:ticker"])
    );
    assert_eq!(
        f.exchange.mock_streaming().calls(),
        vec![
            StreamCall::Connect(vec![channel(&market("kraken:BTC/USD"), FeedKind::Ticker)]),
            StreamCall::Disconnect,
            StreamCall::Disconnect,
            StreamCall::Connect(vec![channel(&market("kraken:ETH/USD"), FeedKind::Ticker)]),
        ],
        "new session opens only after a successful disconnect"
    );
}

#[tokio::test]
async fn failed_open_is_retried() {
    let mut f = fixture(|log| MockExchange::streaming("kraken", log));
    f.exchange
        .mock_streaming()
        .fail_next_connect(ExchangeError::Transport("refused".into()));

    f.store.set_desired(subs(&["kraken:BTC/USD:ticker"]));
    f.worker.reconcile().await;

    assert!(!f.worker.has_session());
    assert!(f.worker.streaming().is_empty());
    assert!(f.store.has_pending("kraken"));

    f.worker.reconcile().await;

    assert!(f.worker.has_session());
    assert_eq!(f.exchange.mock_streaming().connect_count(), 2);
}

#[tokio::test]
async fn stream_events_reach_bus() {
    let mut f = fixture(|log| MockExchange::streaming("kraken", log));
    let btc = market("kraken:BTC/USD");
    let mut rx = f.bus.subscribe(btc.clone(), FeedKind::Ticker);
    f.store.set_desired(subs(&["kraken:BTC/USD:ticker"]));
    f.worker.reconcile().await;

    f.exchange.mock_streaming().push(
        &channel(&btc, FeedKind::Ticker),
        Ok(StreamPayload::Ticker(crate::domain::Ticker::last(dec!(7)))),
    );

    assert_eq!(rx.recv().await, Some(ticker_event(&btc, dec!(7))));
}

// =============================================================================
// Polling
// =============================================================================

#[tokio::test(start_paused = true)]
async fn poll_requests_are_spaced_by_rate_limit() {
    let mut f = fixture(|log| {
        MockExchange::polling("bitfinex", log)
            .with_rate_limits(vec![RateLimit::new(1, Duration::from_secs(1))])
    });
    f.store.set_desired(subs(&[
        "bitfinex:BTC/USD:ticker",
        "bitfinex:ETH/USD:ticker",
        "bitfinex:LTC/USD:ticker",
        "bitfinex:XRP/USD:ticker",
    ]));
    f.worker.reconcile().await;
    let (_tx, mut shutdown) = running();

    f.worker.poll_cycle(&mut shutdown).await;
    f.worker.poll_cycle(&mut shutdown).await;

    assert_eq!(f.log.len(), 8);
    for gap in f.log.gaps() {
        assert!(gap >= Duration::from_millis(250), "gap {gap:?} below 250ms");
    }
}

#[tokio::test(start_paused = true)]
async fn balances_are_fetched_once_per_cycle() {
    let mut f = fixture_with_clients(
        |log| MockExchange::polling("bitfinex", log),
        |log| {
            MockClients::new(log).with_balances(vec![
                balance("BTC", dec!(1)),
                balance("ETH", dec!(2)),
                balance("DOGE", dec!(4)),
            ])
        },
    );
    let mut btc = f.bus.subscribe(market("bitfinex:BTC/EUR"), FeedKind::Balance);
    let mut eth = f.bus.subscribe(market("bitfinex:ETH/EUR"), FeedKind::Balance);
    let mut doge = f.bus.subscribe(market("bitfinex:DOGE/EUR"), FeedKind::Balance);
    f.store.set_desired(subs(&[
        "bitfinex:BTC/USD:balance",
        "bitfinex:ETH/USD:balance",
    ]));
    f.worker.reconcile().await;
    let (_tx, mut shutdown) = running();

    f.worker.poll_cycle(&mut shutdown).await;

    assert_eq!(f.log.count("balances"), 1);
    assert!(btc.try_recv().is_some());
    assert!(eth.try_recv().is_some());
    assert!(doge.try_recv().is_none());
}

#[tokio::test(start_paused = true)]
async fn failed_item_does_not_stop_cycle() {
    let mut f = fixture(|log| MockExchange::polling("bitfinex", log));
    f.exchange.mock_market_data().fail(
        market("bitfinex:BTC/USD").pair().clone(),
        FeedKind::Ticker,
        ExchangeError::Malformed("bad payload".into()),
    );
    let eth = market("bitfinex:ETH/USD");
    let mut rx = f.bus.subscribe(eth.clone(), FeedKind::Ticker);
    f.store.set_desired(subs(&[
        "bitfinex:BTC/USD:ticker",
        "bitfinex:ETH/USD:ticker",
    ]));
    f.worker.reconcile().await;
    let (_tx, mut shutdown) = running();

    f.worker.poll_cycle(&mut shutdown).await;

    assert_eq!(f.log.len(), 2);
    assert!(rx.recv().await.is_some());
}

#[tokio::test(start_paused = true)]
async fn unavailable_feature_yields_empty_result() {
    let mut f = fixture_with_clients(
        |log| MockExchange::polling("bitfinex", log),
        |log| MockClients::new(log).unavailable("open orders"),
    );
    let btc = market("bitfinex:BTC/USD");
    let mut orders = f.bus.subscribe(btc.clone(), FeedKind::OpenOrders);
    f.store.set_desired(subs(&[
        "bitfinex:BTC/USD:open_orders",
        "bitfinex:BTC/USD:ticker",
    ]));
    f.worker.reconcile().await;
    let (_tx, mut shutdown) = running();

    f.worker.poll_cycle(&mut shutdown).await;

    assert_eq!(f.log.len(), 2);
    assert!(f.bus.cached(&btc, FeedKind::Ticker).is_some());
    match orders.try_recv() {
        Some(crate::domain::Event::OpenOrders(e)) => assert!(e.orders.is_empty()),
        other => panic!("expected empty open orders, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn order_book_is_truncated_to_depth() {
    let mut f = fixture(|log| MockExchange::polling("bitfinex", log));
    let btc = market("bitfinex:BTC/USD");
    f.store.set_desired(subs(&["bitfinex:BTC/USD:orderbook"]));
    f.worker.reconcile().await;
    let (_tx, mut shutdown) = running();

    f.worker.poll_cycle(&mut shutdown).await;

    match f.bus.cached(&btc, FeedKind::OrderBook) {
        Some(crate::domain::Event::OrderBook(e)) => {
            assert_eq!(e.book.bids().len(), DEFAULT_ORDER_BOOK_DEPTH);
            assert_eq!(e.book.asks().len(), DEFAULT_ORDER_BOOK_DEPTH);
        }
        other => panic!("expected cached order book, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_poll_cycle() {
    let mut f = fixture(|log| {
        MockExchange::polling("bitfinex", log)
            .with_rate_limits(vec![RateLimit::new(1, Duration::from_secs(60))])
    });
    f.store.set_desired(subs(&[
        "bitfinex:BTC/USD:ticker",
        "bitfinex:ETH/USD:ticker",
    ]));
    f.worker.reconcile().await;
    let (tx, mut shutdown) = running();

    let stop = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send_replace(true);
        tx
    });
    f.worker.poll_cycle(&mut shutdown).await;
    let _tx = stop.await.unwrap();

    assert_eq!(f.log.len(), 1);
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test(start_paused = true)]
async fn run_then_finish_tears_everything_down() {
    let f = fixture(|log| MockExchange::streaming("kraken", log));
    let (tx, shutdown) = running();
    f.store.set_desired(subs(&[
        "kraken:BTC/USD:ticker",
        "kraken:BTC/USD:open_orders",
    ]));

    let handle = tokio::spawn(f.worker.run(shutdown));
    tokio::time::sleep(Duration::from_secs(3)).await;
    tx.send_replace(true);
    let worker = handle.await.unwrap();

    assert_eq!(worker.state(), WorkerState::Idle);
    assert!(worker.has_session());
    assert!(f.log.count("open_orders") >= 1);

    f.store.clear_all();
    worker.finish().await;

    assert_eq!(f.exchange.mock_streaming().disconnect_count(), 1);
}
