//! Storage Schema
//!
//! Table layout expected by the driver. Operations never create or alter
//! tables implicitly; [`SqlHistorian::init_schema`](crate::SqlHistorian::init_schema)
//! applies these statements when bootstrapping an empty database.

/// Topic identity table
pub const CREATE_TOPICS: &str = "CREATE TABLE IF NOT EXISTS topics (
    topic_id INTEGER PRIMARY KEY AUTOINCREMENT,
    topic_name TEXT NOT NULL UNIQUE
)";

/// Reading table keyed on (ts, topic_id)
pub const CREATE_DATA: &str = "CREATE TABLE IF NOT EXISTS data (
    ts TIMESTAMP NOT NULL,
    topic_id INTEGER NOT NULL,
    value_string TEXT NOT NULL,
    PRIMARY KEY (ts, topic_id)
)";

/// All bootstrap statements in dependency order
pub const CREATE_TABLES: [&str; 2] = [CREATE_TOPICS, CREATE_DATA];
