//! SQL Historian CLI
//!
//! Operator commands for a historian store:
//! - `init`: create the topics and data tables
//! - `add-topic` / `topics`: manage topic registrations
//! - `insert`: store one reading
//! - `query`: read a time range for one topic
//! - `exec`: run an administrative statement

mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use sql_historian::{ConnectParams, SqlHistorian};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use commands::Cli;

/// Initialize logging
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let mut params = ConnectParams::load(cli.config.as_deref())
        .context("Failed to load connection parameters")?;
    if let Some(database) = &cli.database {
        params.database = database.clone();
    }
    if cli.create {
        params.create_if_missing = true;
    }

    info!("=== SQL Historian v{} ===", env!("CARGO_PKG_VERSION"));
    let store = SqlHistorian::new(params)
        .await
        .context("Failed to open historian store")?;

    commands::execute(&store, cli.command).await
}
