//! SQL Historian Store
//!
//! Data-access layer for the historian: topic registration, idempotent
//! reading ingestion and time-range queries over a SQLite database.
//!
//! Every operation opens its own connection, does one unit of work and
//! releases the connection again. Nothing is pooled or shared between calls.

mod connection;
mod driver;
mod error;
mod params;
mod query;
mod timestamp;
mod topics;
mod writer;

pub mod schema;

pub use connection::HistorianConnection;
pub use driver::SqlHistorian;
pub use error::{HistorianError, Result};
pub use params::ConnectParams;
pub use query::{BindArg, BuiltQuery, QueryOrder, QueryResult, RangeQuery, DEFAULT_COUNT};
pub use topics::{TopicId, TopicMap, TOPIC_BATCH_SIZE};
