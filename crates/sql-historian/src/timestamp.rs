//! Timestamp storage encoding
//!
//! Timestamps are stored as fixed-width UTC text so that string comparison
//! in SQL matches chronological order. Precision is one microsecond;
//! timestamps carrying finer precision are rejected rather than truncated.

use crate::error::{HistorianError, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Encode a timestamp into its stored column text
pub(crate) fn encode(ts: &DateTime<Utc>) -> Result<String> {
    if ts.timestamp_subsec_nanos() % 1_000 != 0 {
        return Err(HistorianError::InvalidTimestamp(format!(
            "{} has sub-microsecond precision",
            ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
        )));
    }
    Ok(ts.format(STORAGE_FORMAT).to_string())
}

/// Decode stored column text back into a UTC timestamp
pub(crate) fn decode(text: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, STORAGE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| HistorianError::InvalidTimestamp(format!("{:?}: {}", text, e)))
}

/// Render a timestamp the way query results report it
pub(crate) fn render(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}
