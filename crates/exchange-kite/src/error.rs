//! Error types for the Kite Connect integration.
//!
//! Provides typed errors for credentials, API communication, and order
//! placement failures.

use thiserror::Error;

/// Errors that can occur when interacting with Kite Connect.
#[derive(Debug, Error)]
pub enum KiteError {
    /// The session is missing, expired, or rejected (HTTP 401/403 or
    /// `TokenException`).
    #[error("authentication error: {0}")]
    Authentication(String),

    /// API request failed.
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Error message from API.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimit {
        /// Seconds to wait before retry.
        retry_after_secs: u64,
    },

    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// Request timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Invalid order parameters or request input.
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    /// Order rejected by the brokerage.
    #[error("order rejected: {0}")]
    OrderRejected(String),

    /// Configuration error, including missing credentials.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl KiteError {
    /// Creates an API error from status code and message.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a rate limit error.
    pub fn rate_limit(retry_after_secs: u64) -> Self {
        Self::RateLimit { retry_after_secs }
    }

    /// Returns true if the brokerage rejected the session.
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    /// Returns true if the error comes from missing or invalid local setup.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl From<reqwest::Error> for KiteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else if err.is_decode() {
            Self::Serialization(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for KiteError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<csv::Error> for KiteError {
    fn from(err: csv::Error) -> Self {
        Self::Serialization(format!("instrument dump: {err}"))
    }
}

/// Result type alias for Kite operations.
pub type Result<T> = std::result::Result<T, KiteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_construction() {
        let err = KiteError::api(400, "bad request");
        assert!(matches!(
            err,
            KiteError::Api {
                status_code: 400,
                ..
            }
        ));
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("bad request"));
    }

    #[test]
    fn test_rate_limit_error_construction() {
        let err = KiteError::rate_limit(3);
        assert!(matches!(err, KiteError::RateLimit { retry_after_secs: 3 }));
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn test_authentication_classification() {
        let err = KiteError::Authentication("Incorrect `api_key` or `access_token`.".to_string());
        assert!(err.is_authentication());
        assert!(!err.is_configuration());
        assert!(err.to_string().contains("access_token"));
    }

    #[test]
    fn test_configuration_classification() {
        let err = KiteError::Configuration("missing environment variable: KITE_API_KEY".into());
        assert!(err.is_configuration());
        assert!(!err.is_authentication());
        assert!(err.to_string().contains("configuration"));
    }

    #[test]
    fn test_serde_error_conversion() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: KiteError = serde_err.into();
        assert!(matches!(err, KiteError::Serialization(_)));
    }

    #[test]
    fn test_error_display_order_rejected() {
        let err = KiteError::OrderRejected("Insufficient funds".to_string());
        let display = err.to_string();
        assert!(display.contains("rejected"));
        assert!(display.contains("Insufficient funds"));
    }
}
