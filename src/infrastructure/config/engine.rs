//! Engine tuning.

use std::time::Duration;

use serde::Deserialize;

use crate::application::worker::{
    WorkerSettings, DEFAULT_ORDER_BOOK_DEPTH, DEFAULT_TRADE_HISTORY_LIMIT,
};

/// `[engine]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Time one full poll round may take when an exchange publishes no rate
    /// limits (milliseconds).
    #[serde(default = "default_poll_interval_ms")]
    pub default_poll_interval_ms: u64,
    /// Order book levels per side requested when polling.
    #[serde(default = "default_order_book_depth")]
    pub order_book_depth: usize,
    /// User trades requested per trade history poll.
    #[serde(default = "default_trade_history_limit")]
    pub trade_history_limit: usize,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_order_book_depth() -> usize {
    DEFAULT_ORDER_BOOK_DEPTH
}

fn default_trade_history_limit() -> usize {
    DEFAULT_TRADE_HISTORY_LIMIT
}

impl EngineConfig {
    #[must_use]
    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            default_poll_interval: Duration::from_millis(self.default_poll_interval_ms),
            order_book_depth: self.order_book_depth,
            trade_history_limit: self.trade_history_limit,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_poll_interval_ms: default_poll_interval_ms(),
            order_book_depth: default_order_book_depth(),
            trade_history_limit: default_trade_history_limit(),
        }
    }
}
