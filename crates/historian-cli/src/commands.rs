//! Command definitions and handlers

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use sql_historian::{QueryOrder, RangeQuery, SqlHistorian};
use std::path::PathBuf;
use tracing::info;

/// SQL Historian CLI
#[derive(Parser)]
#[command(name = "sqlhistorian")]
#[command(about = "Inspect and maintain a SQL historian store")]
#[command(version)]
pub struct Cli {
    /// Connection config file (TOML, YAML or JSON)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Database file, overrides the config value
    #[arg(long)]
    pub database: Option<String>,

    /// Create the database file if it does not exist
    #[arg(long)]
    pub create: bool,

    /// Log debug output, including generated SQL
    #[arg(long, short)]
    pub verbose: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Create the topics and data tables
    Init,
    /// Register a topic
    AddTopic {
        /// Topic name
        name: String,
        /// Return the existing id instead of failing when already registered
        #[arg(long)]
        if_absent: bool,
    },
    /// List registered topics
    Topics,
    /// Store one reading
    Insert {
        /// Topic name, registered on first use
        #[arg(long)]
        topic: String,
        /// Timestamp (RFC 3339)
        #[arg(long, value_parser = parse_timestamp)]
        ts: DateTime<Utc>,
        /// Value as JSON
        #[arg(long)]
        value: String,
    },
    /// Read a time range for one topic
    Query {
        /// Topic name
        #[arg(long)]
        topic: String,
        /// Exclusive lower bound (RFC 3339)
        #[arg(long, value_parser = parse_timestamp)]
        start: Option<DateTime<Utc>>,
        /// Exclusive upper bound (RFC 3339)
        #[arg(long, value_parser = parse_timestamp)]
        end: Option<DateTime<Utc>>,
        /// Rows to skip
        #[arg(long, default_value = "0")]
        skip: u32,
        /// Maximum rows (defaults to 100)
        #[arg(long)]
        count: Option<u32>,
        /// FIRST_TO_LAST or LAST_TO_FIRST
        #[arg(long, default_value = "FIRST_TO_LAST")]
        order: QueryOrder,
    },
    /// Run an administrative statement and commit it
    Exec {
        /// SQL statement
        statement: String,
    },
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let ts = DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid RFC 3339 timestamp: {}", s))?;
    Ok(ts.with_timezone(&Utc))
}

/// Run a parsed command against the store
pub async fn execute(store: &SqlHistorian, command: Commands) -> Result<()> {
    match command {
        Commands::Init => {
            store.init_schema().await?;
            info!("Schema ready");
        }
        Commands::AddTopic { name, if_absent } => {
            let topic_id = if if_absent {
                store.ensure_topic(&name).await?
            } else {
                if store.get_topic_map().await?.contains_key(&name) {
                    bail!("Topic {} is already registered", name);
                }
                store.insert_topic(&name).await?
            };
            println!("{}\t{}", topic_id, name);
        }
        Commands::Topics => {
            let mut topics: Vec<_> = store.get_topic_map().await?.into_iter().collect();
            topics.sort_by_key(|(_, topic_id)| *topic_id);
            for (name, topic_id) in topics {
                println!("{}\t{}", topic_id, name);
            }
        }
        Commands::Insert { topic, ts, value } => {
            let value: serde_json::Value =
                serde_json::from_str(&value).context("Value is not valid JSON")?;
            let topic_id = match store.get_topic_map().await?.get(&topic) {
                Some(topic_id) => *topic_id,
                None => store.insert_topic(&topic).await?,
            };
            store.insert_reading(&ts, topic_id, &value).await?;
            info!("Stored reading for {} at {}", topic, ts);
        }
        Commands::Query {
            topic,
            start,
            end,
            skip,
            count,
            order,
        } => {
            let request = RangeQuery {
                topic,
                start,
                end,
                skip,
                count,
                order,
            };
            let result = store.query(&request).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Exec { statement } => {
            let rows = store.execute(&statement).await?;
            info!("{} rows affected", rows);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_query_args() {
        let cli = Cli::try_parse_from([
            "sqlhistorian",
            "query",
            "--topic",
            "building/meter1",
            "--start",
            "2024-01-01T00:00:00Z",
            "--order",
            "LAST_TO_FIRST",
        ])
        .unwrap();

        match cli.command {
            Commands::Query { topic, start, end, skip, count, order } => {
                assert_eq!(topic, "building/meter1");
                assert!(start.is_some());
                assert!(end.is_none());
                assert_eq!(skip, 0);
                assert_eq!(count, None);
                assert_eq!(order, QueryOrder::LastToFirst);
            }
            _ => panic!("expected query command"),
        }
    }

    #[test]
    fn test_unknown_order_rejected() {
        let result = Cli::try_parse_from([
            "sqlhistorian",
            "query",
            "--topic",
            "t",
            "--order",
            "NEWEST",
        ]);
        assert!(result.is_err());
    }
}
