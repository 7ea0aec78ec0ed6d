//! Command-line interface.

pub mod check;
pub mod command;
pub mod run;

pub use command::{CheckArgs, Cli, Commands, RunArgs};

use crate::error::Result;

/// Dispatch a parsed command line.
pub async fn execute(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Run(args) => run::execute(args).await,
        Commands::Check(args) => check::execute(args),
    }
}
