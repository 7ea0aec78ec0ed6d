//! Handler for the `check` command.

use super::command::CheckArgs;
use crate::error::Result;
use crate::infrastructure::config::Config;

/// Load and validate the configuration, then print a short summary.
pub fn execute(args: &CheckArgs) -> Result<()> {
    let config = Config::load(&args.config)?;

    println!("Configuration valid: {}", args.config.display());
    println!(
        "  poll interval: {}ms, book depth: {}, history limit: {}",
        config.engine.default_poll_interval_ms,
        config.engine.order_book_depth,
        config.engine.trade_history_limit
    );
    for exchange in &config.exchanges {
        let transport = if exchange.streaming { "streaming" } else { "polling" };
        println!(
            "  exchange {}: {} markets, {}",
            exchange.name,
            exchange.markets.len(),
            transport
        );
    }
    println!("  subscriptions: {}", config.subscriptions.len());
    Ok(())
}
