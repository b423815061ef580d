//! Error types for callwise-core

use crate::import::ImportError;
use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Date string was not `YYYY-MM-DD`
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    /// CSV upload could not be imported
    #[error("import error: {0}")]
    Import(#[from] ImportError),

    /// Scoring policy values are out of range
    #[error("invalid scoring policy: {0}")]
    InvalidPolicy(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
