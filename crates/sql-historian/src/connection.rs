//! Per-call connection provider

use crate::error::{HistorianError, Result};
use crate::params::ConnectParams;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection, Database, TransactionManager};
use std::ops::{Deref, DerefMut};
use tracing::{debug, info};

type SqliteTransactionManager = <Sqlite as Database>::TransactionManager;

/// Opens one fresh connection per operation
///
/// Nothing is pooled. Writers wrap their work in `begin()`/`commit()`, so a
/// connection dropped before commit rolls back and closes.
#[derive(Debug, Clone)]
pub(crate) struct ConnectionProvider {
    options: SqliteConnectOptions,
}

impl ConnectionProvider {
    /// Validate parameters and prove a round-trip connection works
    pub(crate) async fn establish(params: &ConnectParams) -> Result<Self> {
        params.validate()?;

        let provider = Self {
            options: params.connect_options(),
        };
        provider.check_connection().await.map_err(|e| {
            HistorianError::Config(format!(
                "Couldn't connect using specified configuration credentials: {}",
                e
            ))
        })?;

        info!("Connection check passed for {}", params.database);
        Ok(provider)
    }

    async fn check_connection(&self) -> std::result::Result<(), sqlx::Error> {
        let mut conn = self.options.connect().await?;
        conn.ping().await?;
        conn.close().await
    }

    /// Open a new connection
    pub(crate) async fn connect(&self) -> Result<SqliteConnection> {
        debug!("Opening connection");
        Ok(self.options.connect().await?)
    }
}

/// A connection with an open transaction, for callers running their own
/// statements.
///
/// Nothing is persisted until [`commit`](HistorianConnection::commit).
/// Dropping it without committing rolls the transaction back and closes the
/// connection. Calling `begin()` on it opens a nested savepoint.
#[derive(Debug)]
pub struct HistorianConnection {
    conn: SqliteConnection,
    open: bool,
}

impl HistorianConnection {
    pub(crate) async fn begin(mut conn: SqliteConnection) -> Result<Self> {
        SqliteTransactionManager::begin(&mut conn).await?;
        Ok(Self { conn, open: true })
    }

    /// Commit the transaction and close the connection
    pub async fn commit(mut self) -> Result<()> {
        SqliteTransactionManager::commit(&mut self.conn).await?;
        self.open = false;
        Ok(())
    }

    /// Roll the transaction back and close the connection
    pub async fn rollback(mut self) -> Result<()> {
        SqliteTransactionManager::rollback(&mut self.conn).await?;
        self.open = false;
        Ok(())
    }
}

impl Deref for HistorianConnection {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl DerefMut for HistorianConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

impl Drop for HistorianConnection {
    fn drop(&mut self) {
        if self.open {
            debug!("Rolling back uncommitted connection");
            SqliteTransactionManager::start_rollback(&mut self.conn);
        }
    }
}
