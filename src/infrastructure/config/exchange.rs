//! Simulated exchange definitions.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Deserialize;

/// One `[[exchanges]]` entry, served by the paper adapter.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    pub name: String,
    /// Offer native streaming for tickers, books and trades.
    #[serde(default)]
    pub streaming: bool,
    /// Published rate limit, `rate_limit_calls` per `rate_limit_period_ms`.
    /// Omit to publish no limits.
    #[serde(default)]
    pub rate_limit_calls: Option<u32>,
    #[serde(default = "default_rate_limit_period_ms")]
    pub rate_limit_period_ms: u64,
    /// Listed pairs, `BASE/COUNTER`.
    #[serde(default)]
    pub markets: Vec<String>,
    /// Starting price of every listed pair.
    #[serde(default = "default_start_price")]
    pub start_price: Decimal,
    /// Interval between pushed streaming updates (milliseconds).
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Wallet contents, currency to amount.
    #[serde(default)]
    pub balances: BTreeMap<String, Decimal>,
}

fn default_rate_limit_period_ms() -> u64 {
    1000
}

fn default_start_price() -> Decimal {
    Decimal::ONE_HUNDRED
}

fn default_tick_ms() -> u64 {
    1000
}
