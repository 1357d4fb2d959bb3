//! JSON error responses.
//!
//! Every handler failure becomes `{success: false, error, message, loginUrl?}`
//! with a status code chosen by the error kind.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use squareoff_core::CoreError;
use squareoff_kite::KiteError;

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Brokerage or platform unreachable, or answered with a failure.
    #[error("{0}")]
    Upstream(String),

    /// The brokerage session is missing or expired.
    #[error("{message}")]
    AuthExpired {
        message: String,
        login_url: Option<String>,
    },

    /// The mock positions file is unreadable or malformed.
    #[error(transparent)]
    MockData(CoreError),

    /// Required input is missing or invalid.
    #[error("{0}")]
    BadRequest(String),

    /// Brokerage credentials are not configured.
    #[error("{0}")]
    MissingCredentials(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    success: bool,
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    login_url: Option<String>,
}

impl ApiError {
    /// Maps a brokerage error, attaching a re-login link to auth failures.
    #[must_use]
    pub fn from_kite(err: KiteError, login_url: Option<String>) -> Self {
        match err {
            KiteError::Authentication(message) => Self::AuthExpired { message, login_url },
            KiteError::Configuration(message) => Self::MissingCredentials(message),
            KiteError::InvalidOrder(message) => Self::BadRequest(message),
            other => Self::Upstream(other.to_string()),
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::AuthExpired { .. } => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) | Self::MockData(_) | Self::MissingCredentials(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Upstream(_) => "upstream",
            Self::AuthExpired { .. } => "auth_expired",
            Self::MockData(_) => "mock_data",
            Self::BadRequest(_) => "bad_request",
            Self::MissingCredentials(_) => "missing_credentials",
        }
    }
}

impl From<KiteError> for ApiError {
    fn from(err: KiteError) -> Self {
        Self::from_kite(err, None)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self::MockData(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, kind = self.kind(), "Request failed");
        } else {
            tracing::info!(error = %self, kind = self.kind(), "Request rejected");
        }

        let message = self.to_string();
        let error = self.kind();
        let login_url = match self {
            Self::AuthExpired { login_url, .. } => login_url,
            _ => None,
        };

        let body = ErrorBody {
            success: false,
            error,
            message,
            login_url,
        };

        (status, Json(body)).into_response()
    }
}
