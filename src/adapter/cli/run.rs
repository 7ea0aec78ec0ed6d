//! Handler for the `run` command.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::command::RunArgs;
use crate::adapter::paper::PaperDirectory;
use crate::application::{Engine, FeedReceiver};
use crate::domain::{Event, Subscription};
use crate::error::Result;
use crate::infrastructure::config::Config;

/// Execute the run command.
pub async fn execute(args: &RunArgs) -> Result<()> {
    let config = Config::load(&args.config)?;
    config.init_logging();

    let mut subscriptions: BTreeSet<Subscription> =
        config.startup_subscriptions()?.into_iter().collect();
    for raw in &args.subscriptions {
        subscriptions.insert(raw.parse()?);
    }

    let directory = Arc::new(PaperDirectory::from_config(
        &config.exchanges,
        config.engine.order_book_depth,
    )?);
    let engine = Arc::new(Engine::new(
        directory.clone(),
        directory,
        config.engine.worker_settings(),
    ));
    info!(
        exchanges = engine.exchanges().len(),
        subscriptions = subscriptions.len(),
        "marketbus starting"
    );

    let mut printers = JoinSet::new();
    for subscription in &subscriptions {
        let rx = engine.subscribe(subscription.market().clone(), subscription.kind());
        printers.spawn(print_events(rx, args.json));
    }
    engine.registry().register("cli", subscriptions);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let duration = args.duration.map(Duration::from_secs);
    tokio::spawn(async move {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                    std::future::pending::<()>().await;
                }
                info!("Shutdown signal received");
            }
        }
        shutdown_tx.send_replace(true);
    });

    engine.run(shutdown_rx).await;
    printers.shutdown().await;
    info!("marketbus stopped");
    Ok(())
}

async fn print_events(mut rx: FeedReceiver, json: bool) {
    while let Some(event) = rx.recv().await {
        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "Failed to encode event"),
            }
        } else {
            println!("{}", describe(&event));
        }
    }
}

/// One-line human-readable summary of an event.
fn describe(event: &Event) -> String {
    match event {
        Event::Ticker(e) => format!("{} ticker last={}", e.market, e.ticker.last),
        Event::OrderBook(e) => {
            let best = |level: Option<&crate::domain::PriceLevel>| {
                level.map_or_else(|| "-".to_string(), |l| l.price().to_string())
            };
            format!(
                "{} book bid={} ask={} depth={}/{}",
                e.market,
                best(e.book.best_bid()),
                best(e.book.best_ask()),
                e.book.bids().len(),
                e.book.asks().len()
            )
        }
        Event::Trades(e) => format!("{} trades count={}", e.market, e.trades.len()),
        Event::OpenOrders(e) => format!("{} open_orders count={}", e.market, e.orders.len()),
        Event::TradeHistory(e) => format!("{} history count={}", e.market, e.trades.len()),
        Event::Balance(e) => format!(
            "{} balance {} total={} available={}",
            e.exchange,
            e.currency(),
            e.balance.total,
            e.balance.available
        ),
    }
}
