//! Range Query Engine
//!
//! Builds the time-range query for one topic and runs it. Construction is
//! kept separate from execution so the generated SQL can be checked without
//! a database.

use crate::driver::SqlHistorian;
use crate::error::{HistorianError, Result};
use crate::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::Connection;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error, Instrument};

/// Row limit applied when a query does not set `count`
pub const DEFAULT_COUNT: u32 = 100;

/// Direction results are returned in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryOrder {
    /// Oldest reading first
    #[default]
    FirstToLast,
    /// Newest reading first
    LastToFirst,
}

impl QueryOrder {
    /// Name used on the wire and in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryOrder::FirstToLast => "FIRST_TO_LAST",
            QueryOrder::LastToFirst => "LAST_TO_FIRST",
        }
    }

    fn order_by(&self) -> &'static str {
        match self {
            QueryOrder::FirstToLast => "ORDER BY data.ts ASC",
            QueryOrder::LastToFirst => "ORDER BY data.ts DESC",
        }
    }
}

impl fmt::Display for QueryOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryOrder {
    type Err = HistorianError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "FIRST_TO_LAST" => Ok(QueryOrder::FirstToLast),
            "LAST_TO_FIRST" => Ok(QueryOrder::LastToFirst),
            other => Err(HistorianError::InvalidOrder(other.to_string())),
        }
    }
}

/// Parameters of a time-range query for one topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeQuery {
    /// Topic name to read
    pub topic: String,
    /// Exclusive lower bound, microsecond precision
    pub start: Option<DateTime<Utc>>,
    /// Exclusive upper bound, microsecond precision
    pub end: Option<DateTime<Utc>>,
    /// Rows to skip before returning results
    pub skip: u32,
    /// Maximum rows returned, [`DEFAULT_COUNT`] when unset
    pub count: Option<u32>,
    /// Result direction
    pub order: QueryOrder,
}

impl RangeQuery {
    /// Query `topic` with no bounds in ascending order, limited to [`DEFAULT_COUNT`] rows
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            start: None,
            end: None,
            skip: 0,
            count: None,
            order: QueryOrder::default(),
        }
    }

    pub fn start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    pub fn skip(mut self, skip: u32) -> Self {
        self.skip = skip;
        self
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn order(mut self, order: QueryOrder) -> Self {
        self.order = order;
        self
    }

    /// Produce the SQL text and its bind arguments.
    ///
    /// Fails when a bound has sub-microsecond precision, since it could not
    /// be compared against stored timestamps exactly.
    pub fn build(&self) -> Result<BuiltQuery> {
        let mut where_clauses = vec![
            "WHERE topics.topic_name = ?",
            "topics.topic_id = data.topic_id",
        ];
        let mut args = vec![BindArg::Text(self.topic.clone())];

        if let Some(start) = &self.start {
            where_clauses.push("data.ts > ?");
            args.push(BindArg::Text(timestamp::encode(start)?));
        }
        if let Some(end) = &self.end {
            where_clauses.push("data.ts < ?");
            args.push(BindArg::Text(timestamp::encode(end)?));
        }

        let mut lines = vec![
            "SELECT data.ts, data.value_string".to_string(),
            "FROM data, topics".to_string(),
            where_clauses.join(" AND "),
            self.order.order_by().to_string(),
            "LIMIT ?".to_string(),
        ];
        args.push(BindArg::Int(i64::from(self.count.unwrap_or(DEFAULT_COUNT))));

        // SQLite only accepts OFFSET after LIMIT
        if self.skip > 0 {
            lines.push("OFFSET ?".to_string());
            args.push(BindArg::Int(i64::from(self.skip)));
        }

        Ok(BuiltQuery {
            sql: lines.join("\n"),
            args,
        })
    }
}

/// A positional bind argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindArg {
    Text(String),
    Int(i64),
}

/// SQL text plus its positional arguments, in bind order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    pub sql: String,
    pub args: Vec<BindArg>,
}

/// Readings returned by a range query
///
/// `metadata` is never filled in by the store. An empty `values` list and an
/// empty `metadata` map both mean "no data".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// `(timestamp, value)` pairs in query order
    pub values: Vec<(String, Value)>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SqlHistorian {
    /// Read readings for one topic.
    ///
    /// Bounds are exclusive at both ends. An unregistered topic returns an
    /// empty result rather than an error.
    pub async fn query(&self, request: &RangeQuery) -> Result<QueryResult> {
        let built = request.build()?;

        async move {
            debug!("Real query: {}", built.sql);
            debug!("Args: {:?}", built.args);

            let mut query = sqlx::query_as::<_, (String, String)>(&built.sql);
            for arg in &built.args {
                query = match arg {
                    BindArg::Text(text) => query.bind(text.as_str()),
                    BindArg::Int(value) => query.bind(*value),
                };
            }

            let mut conn = self.provider.connect().await?;
            let rows = query.fetch_all(&mut conn).await.map_err(|e| {
                error!("Range query for {} failed: {}", request.topic, e);
                e
            })?;
            conn.close().await?;

            let values = rows
                .into_iter()
                .map(|(ts, value)| -> Result<(String, Value)> {
                    let ts = timestamp::decode(&ts)?;
                    Ok((timestamp::render(&ts), serde_json::from_str(&value)?))
                })
                .collect::<Result<Vec<_>>>()?;

            debug!("Range query for {} returned {} rows", request.topic, values.len());
            Ok(QueryResult {
                values,
                metadata: Map::new(),
            })
        }
        .instrument(self.span.clone())
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_default_query() {
        let built = RangeQuery::new("building/meter1").build().unwrap();
        assert_eq!(
            built.sql,
            "SELECT data.ts, data.value_string\n\
             FROM data, topics\n\
             WHERE topics.topic_name = ? AND topics.topic_id = data.topic_id\n\
             ORDER BY data.ts ASC\n\
             LIMIT ?"
        );
        assert_eq!(
            built.args,
            vec![BindArg::Text("building/meter1".to_string()), BindArg::Int(100)]
        );
    }

    #[test]
    fn test_bounded_descending_page() {
        let built = RangeQuery::new("building/meter1")
            .start(ts(50))
            .end(ts(250))
            .skip(200)
            .count(100)
            .order(QueryOrder::LastToFirst)
            .build().unwrap();

        assert!(built
            .sql
            .contains("WHERE topics.topic_name = ? AND topics.topic_id = data.topic_id AND data.ts > ? AND data.ts < ?"));
        assert!(built.sql.contains("ORDER BY data.ts DESC"));
        assert!(built.sql.ends_with("LIMIT ?\nOFFSET ?"));
        assert_eq!(
            built.args,
            vec![
                BindArg::Text("building/meter1".to_string()),
                BindArg::Text("1970-01-01 00:00:50.000000".to_string()),
                BindArg::Text("1970-01-01 00:04:10.000000".to_string()),
                BindArg::Int(100),
                BindArg::Int(200),
            ]
        );
    }

    #[test]
    fn test_end_without_start() {
        let built = RangeQuery::new("t").end(ts(10)).build().unwrap();
        assert!(built.sql.contains("data.ts < ?"));
        assert!(!built.sql.contains("data.ts > ?"));
        assert_eq!(built.args.len(), 3);
    }

    #[test]
    fn test_skip_keeps_default_limit() {
        let built = RangeQuery::new("t").skip(200).build().unwrap();
        assert_eq!(&built.args[1..], &[BindArg::Int(100), BindArg::Int(200)]);
    }

    #[test]
    fn test_sub_microsecond_bound_rejected() {
        let end = Utc.timestamp_opt(100, 500).unwrap();
        let result = RangeQuery::new("t").end(end).build();
        assert!(matches!(result, Err(HistorianError::InvalidTimestamp(_))));
    }

    #[test]
    fn test_order_parsing_is_strict() {
        assert_eq!("FIRST_TO_LAST".parse::<QueryOrder>().unwrap(), QueryOrder::FirstToLast);
        assert_eq!("LAST_TO_FIRST".parse::<QueryOrder>().unwrap(), QueryOrder::LastToFirst);
        assert!(matches!(
            "last_to_first".parse::<QueryOrder>(),
            Err(HistorianError::InvalidOrder(_))
        ));
        assert!(matches!("".parse::<QueryOrder>(), Err(HistorianError::InvalidOrder(_))));
    }

    #[test]
    fn test_order_serde_names() {
        assert_eq!(
            serde_json::to_string(&QueryOrder::LastToFirst).unwrap(),
            "\"LAST_TO_FIRST\""
        );
        assert_eq!(QueryOrder::default().to_string(), "FIRST_TO_LAST");
    }

    #[test]
    fn test_result_metadata_defaults_to_empty() {
        let result: QueryResult = serde_json::from_str(r#"{"values": []}"#).unwrap();
        assert!(result.is_empty());
        assert!(result.metadata.is_empty());
    }

    proptest! {
        #[test]
        fn prop_placeholders_match_args(
            start in proptest::option::of(0i64..1_000_000),
            end in proptest::option::of(0i64..1_000_000),
            skip in 0u32..10_000,
            count in proptest::option::of(1u32..10_000),
            descending in any::<bool>(),
        ) {
            let mut request = RangeQuery::new("sensor");
            request.start = start.map(ts);
            request.end = end.map(ts);
            request.skip = skip;
            request.count = count;
            if descending {
                request.order = QueryOrder::LastToFirst;
            }
            let built = request.build().unwrap();

            prop_assert_eq!(built.sql.matches('?').count(), built.args.len());
            prop_assert!(built.sql.contains("LIMIT ?"));
            prop_assert_eq!(built.sql.contains("OFFSET ?"), skip > 0);

            let limit_index = 1 + usize::from(start.is_some()) + usize::from(end.is_some());
            let expected_limit = i64::from(count.unwrap_or(DEFAULT_COUNT));
            prop_assert_eq!(&built.args[limit_index], &BindArg::Int(expected_limit));
            if skip > 0 {
                prop_assert_eq!(&built.args[limit_index + 1], &BindArg::Int(i64::from(skip)));
            }
        }
    }
}
