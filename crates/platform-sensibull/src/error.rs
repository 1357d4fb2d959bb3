//! Error types for the platform probe.

use thiserror::Error;

/// Errors that can occur while probing the trading platform.
#[derive(Debug, Error)]
pub enum SensibullError {
    /// The platform could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The probe did not complete in time.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// The HTTP client could not be built.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for SensibullError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Result type alias for platform operations.
pub type Result<T> = std::result::Result<T, SensibullError>;
