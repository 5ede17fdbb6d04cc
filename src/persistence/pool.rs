//! Read-only SQLite connection management
//!
//! Every agent run opens its own connection; connections are never shared
//! between concurrent runs.

use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};

use crate::persistence::error::PersistenceError;

/// A SQLite database file the agent is allowed to read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseTarget {
    path: PathBuf,
}

impl DatabaseTarget {
    /// Create a target for an existing database file
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        if !path.is_file() {
            return Err(PersistenceError::NotFound(path));
        }
        Ok(Self { path })
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a fresh read-only connection to the database
    pub async fn connect_read_only(&self) -> Result<SqliteConnection, PersistenceError> {
        tracing::debug!("Opening read-only connection to {}", self.path.display());

        SqliteConnectOptions::new()
            .filename(&self.path)
            .read_only(true)
            .create_if_missing(false)
            .connect()
            .await
            .map_err(|e| PersistenceError::Connection(e.to_string()))
    }
}

/// Check that a connection is still usable
pub async fn health_check(conn: &mut SqliteConnection) -> Result<(), PersistenceError> {
    conn.ping()
        .await
        .map_err(|e| PersistenceError::Connection(format!("Health check failed: {}", e)))
}
