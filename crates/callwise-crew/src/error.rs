//! Error types for callwise-crew

use std::path::PathBuf;
use thiserror::Error;

/// Crew error type
#[derive(Debug, Error)]
pub enum CrewError {
    /// Invalid agent or task definitions
    #[error("configuration error: {0}")]
    Config(String),

    /// File could not be read or written
    #[error("i/o error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Definition file is not valid TOML
    #[error("invalid TOML in {path}: {message}")]
    Toml {
        /// File involved
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// A `{placeholder}` has no input value
    #[error("missing input '{0}'")]
    MissingInput(String),

    /// Trigger payload is not valid JSON
    #[error("invalid trigger payload: {0}")]
    InvalidPayload(String),

    /// Replay target does not exist
    #[error("task '{0}' not found")]
    UnknownTask(String),

    /// Replay requested without a stored run
    #[error("no stored run at {0}")]
    NoRunLog(PathBuf),

    /// Stored run log could not be (de)serialized
    #[error("run log error: {0}")]
    RunLog(String),

    /// LLM provider error
    #[error("llm error: {0}")]
    Llm(#[from] callwise_llm::Error),
}

impl CrewError {
    /// Whether a later kickoff may succeed: rate limits and overloaded providers
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Llm(e) => e.is_transient(),
            other => other.to_string().to_lowercase().contains("overloaded"),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CrewError>;
