//! Error types for callwise-store

use callwise_core::CustomerId;
use thiserror::Error;

/// Store error type
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite / sqlx failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Referenced customer does not exist
    #[error("customer {0} not found")]
    CustomerNotFound(CustomerId),

    /// Filesystem failure while preparing the database path
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StoreError>;
