//! Error types for snapshot persistence.

use thiserror::Error;

/// Errors from the day store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored document could not be decoded.
    #[error("invalid stored document: {0}")]
    InvalidDocument(#[from] serde_json::Error),
}
