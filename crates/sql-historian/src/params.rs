//! Connection Parameters

use crate::error::{HistorianError, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteConnectOptions;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix used by [`ConnectParams::load`]
pub const ENV_PREFIX: &str = "HISTORIAN";

/// Parameters used to open every historian connection
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectParams {
    /// Path of the SQLite database file
    pub database: String,
    /// Account name; required and validated only, SQLite has no authentication
    pub user: String,
    /// Account secret; required and validated only, SQLite has no authentication
    pub password: String,
    /// Create the database file when it does not exist yet
    pub create_if_missing: bool,
    /// How long a statement waits on a locked database (ms)
    pub busy_timeout_ms: u64,
    /// Extra pragmas passed through to every connection
    pub pragmas: BTreeMap<String, String>,
}

impl Default for ConnectParams {
    fn default() -> Self {
        Self {
            database: String::new(),
            user: String::new(),
            password: String::new(),
            create_if_missing: false,
            busy_timeout_ms: 5000,
            pragmas: BTreeMap::new(),
        }
    }
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("create_if_missing", &self.create_if_missing)
            .field("busy_timeout_ms", &self.busy_timeout_ms)
            .field("pragmas", &self.pragmas)
            .finish()
    }
}

impl ConnectParams {
    /// Create parameters for a database file and account
    pub fn new(
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            user: user.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// Enable or disable creating a missing database file
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    /// Add a pragma applied when each connection opens
    pub fn pragma(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pragmas.insert(key.into(), value.into());
        self
    }

    /// Load parameters from an optional config file layered under
    /// `HISTORIAN__*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let params = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;
        Ok(params)
    }

    /// Check the required fields are present
    pub fn validate(&self) -> Result<()> {
        if self.user.trim().is_empty() {
            return Err(HistorianError::Config(
                "Invalid parameter for \"user\" specified".to_string(),
            ));
        }
        if self.password.is_empty() {
            return Err(HistorianError::Config(
                "Invalid parameter for \"password\" specified".to_string(),
            ));
        }
        if self.database.trim().is_empty() {
            return Err(HistorianError::Config(
                "Invalid \"database\" specified".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn connect_options(&self) -> SqliteConnectOptions {
        let mut options = SqliteConnectOptions::new()
            .filename(&self.database)
            .create_if_missing(self.create_if_missing)
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms));
        for (key, value) in &self.pragmas {
            options = options.pragma(key.clone(), value.clone());
        }
        options
    }
}
