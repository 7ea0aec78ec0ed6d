//! Canonical test configurations.
//!
//! Single source of truth for config content used across tests.

use std::time::Duration;

use crate::application::WorkerSettings;

/// A valid configuration with one streaming and one polling exchange.
pub const SAMPLE_TOML: &str = r#"
subscriptions = ["kraken:BTC/USD:ticker", "bitstamp:ETH/EUR:orderbook"]

[logging]
level = "warn"
format = "compact"

[engine]
default_poll_interval_ms = 200
order_book_depth = 5
trade_history_limit = 10

[[exchanges]]
name = "kraken"
streaming = true
markets = ["BTC/USD", "ETH/USD"]
tick_ms = 50

[exchanges.balances]
BTC = "1.5"
USD = "2500"

[[exchanges]]
name = "bitstamp"
rate_limit_calls = 8
rate_limit_period_ms = 1000
markets = ["ETH/EUR"]
start_price = "2000"
"#;

/// Worker settings with a custom fallback poll interval.
pub fn worker_settings(default_poll_interval: Duration) -> WorkerSettings {
    WorkerSettings {
        default_poll_interval,
        ..WorkerSettings::default()
    }
}
