//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Market data subscription engine for crypto exchanges
#[derive(Parser, Debug)]
#[command(name = "marketbus")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the engine and print events for the requested feeds
    Run(RunArgs),

    /// Validate a configuration file
    Check(CheckArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the configuration file
    #[arg(short, long, default_value = "marketbus.toml")]
    pub config: PathBuf,

    /// Feed to subscribe to, `exchange:BASE/COUNTER:kind` (repeatable)
    #[arg(short, long = "subscribe", value_name = "SUBSCRIPTION")]
    pub subscriptions: Vec<String>,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long, value_name = "SECS")]
    pub duration: Option<u64>,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to the configuration file
    #[arg(short, long, default_value = "marketbus.toml")]
    pub config: PathBuf,
}
