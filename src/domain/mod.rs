//! Exchange-agnostic domain types.
//!
//! - [`id`] - [`MarketId`] and [`CurrencyPair`]
//! - [`feed`] - [`FeedKind`] and [`Subscription`]
//! - [`market_data`] - tickers, order books, trades, orders, balances
//! - [`event`] - the canonical [`Event`] broadcast to consumers
//! - [`error`] - parse/validation errors

pub mod error;
pub mod event;
pub mod feed;
pub mod id;
pub mod market_data;

pub use error::DomainError;
pub use event::{
    BalanceEvent, Event, OpenOrdersEvent, OrderBookEvent, TickerEvent, TradeHistoryEvent,
    TradesEvent,
};
pub use feed::{FeedKind, Subscription};
pub use id::{CurrencyPair, MarketId};
pub use market_data::{Balance, Order, OrderBook, PriceLevel, Side, Ticker, Trade};
