//! Persistence layer error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in the persistence layer
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Database file does not exist
    #[error("Database not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Database connection error
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Schema could not be read
    #[error("Error extracting schema: {0}")]
    Schema(String),

    /// Database error from SQLx
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PersistenceError {
    /// Convert to HTTP status code for API responses
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
