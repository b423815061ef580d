//! Provider errors

use thiserror::Error;

/// Failure talking to a model backend
#[derive(Debug, Error)]
pub enum Error {
    /// Missing key or unusable model string
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// Backend rejected the request
    #[error("api error: {0}")]
    Api(String),

    /// HTTP 429
    #[error("rate limit exceeded")]
    RateLimit,

    /// Backend is shedding load
    #[error("provider overloaded: {0}")]
    Overloaded(String),

    /// Body did not decode
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Connection-level failure
    #[error("network error: {0}")]
    Network(String),

    /// No answer within the configured timeout, in milliseconds
    #[error("timeout after {0}ms")]
    Timeout(u64),
}

impl Error {
    /// Rate limits and overload; the same request may succeed later
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimit | Self::Overloaded(_) => true,
            // some gateways relay overload as a plain API error
            other => other.to_string().to_lowercase().contains("overloaded"),
        }
    }
}

/// `Result` with [`Error`]
pub type Result<T> = std::result::Result<T, Error>;
