//! Historian Driver

use crate::connection::{ConnectionProvider, HistorianConnection};
use crate::error::Result;
use crate::params::ConnectParams;
use crate::schema;
use sqlx::Connection;
use tracing::{debug, error, info, info_span, Instrument, Span};

/// SQLite-backed historian store
///
/// Holds only the validated connection options and the span its operations
/// log under. Each operation opens, uses and releases its own connection.
#[derive(Debug, Clone)]
pub struct SqlHistorian {
    pub(crate) provider: ConnectionProvider,
    pub(crate) span: Span,
}

impl SqlHistorian {
    /// Validate `params` and check that a connection can be made.
    ///
    /// Fails with [`HistorianError::Config`](crate::HistorianError::Config)
    /// when a required field is empty or the round-trip connection fails.
    pub async fn new(params: ConnectParams) -> Result<Self> {
        let span = info_span!("sql_historian", database = %params.database);
        let provider = ConnectionProvider::establish(&params)
            .instrument(span.clone())
            .await?;
        span.in_scope(|| info!("Historian store ready"));
        Ok(Self { provider, span })
    }

    /// Log all subsequent operations under `span` instead of the default
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Span operations are recorded under
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Open a connection for callers running their own statements.
    ///
    /// The connection starts inside a transaction; work done on it is only
    /// persisted by [`HistorianConnection::commit`].
    pub async fn connect(&self) -> Result<HistorianConnection> {
        async move {
            let conn = self.provider.connect().await?;
            HistorianConnection::begin(conn).await
        }
        .instrument(self.span.clone())
        .await
    }

    /// Run one administrative statement and commit it.
    ///
    /// Returns the number of rows affected.
    pub async fn execute(&self, statement: &str) -> Result<u64> {
        async move {
            debug!("Executing statement: {}", statement);
            let mut conn = self.provider.connect().await?;
            let mut tx = conn.begin().await?;
            let result = sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    error!("Statement failed: {}", e);
                    e
                })?;
            tx.commit().await?;
            conn.close().await?;
            Ok(result.rows_affected())
        }
        .instrument(self.span.clone())
        .await
    }

    /// Create the `topics` and `data` tables when they are missing
    pub async fn init_schema(&self) -> Result<()> {
        async move {
            let mut conn = self.provider.connect().await?;
            let mut tx = conn.begin().await?;
            for statement in schema::CREATE_TABLES {
                sqlx::query(statement).execute(&mut *tx).await?;
            }
            tx.commit().await?;
            conn.close().await?;
            info!("Schema initialized");
            Ok(())
        }
        .instrument(self.span.clone())
        .await
    }
}
