//! Marketbus - market data subscription and event distribution for crypto
//! exchanges.
//!
//! Consumers declare which feeds they want per market (ticker, order book,
//! trades, open orders, trade history, balances). One worker per exchange
//! reconciles that desired state against the live transports, streaming
//! what the exchange can stream and polling the rest at a rate-limit-aware
//! pace. Every result is normalized into an [`domain::Event`] and fanned out
//! through the [`application::EventBus`].
//!
//! # Modules
//!
//! - [`domain`] - exchange-agnostic types: ids, feeds, market data, events
//! - [`port`] - traits the engine needs from exchange integrations
//! - [`application`] - bus, desired state, workers, engine
//! - [`infrastructure`] - configuration and logging
//! - [`adapter`] - paper exchanges and the CLI (requires `paper` feature)
//! - [`error`] - error types for the crate
//!
//! # Features
//!
//! - `paper` - simulated exchanges and the `marketbus` binary
//! - `testkit` - mock exchanges for integration tests
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use marketbus::application::{Engine, WorkerSettings};
//! use marketbus::domain::{FeedKind, MarketId, Subscription};
//! # fn demo(
//! #     directory: Arc<dyn marketbus::port::exchange::ExchangeDirectory>,
//! #     clients: Arc<dyn marketbus::port::exchange::ClientFactory>,
//! # ) {
//! let engine = Engine::new(directory, clients, WorkerSettings::default());
//! let market = MarketId::new("kraken", "BTC", "USD");
//! let mut ticks = engine.subscribe(market.clone(), FeedKind::Ticker);
//! engine.set_desired([Subscription::new(market, FeedKind::Ticker)]);
//! # }
//! ```

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(feature = "paper")]
pub mod adapter;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
