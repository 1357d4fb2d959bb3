//! Login probe against the platform's positions page.

use crate::error::{Result, SensibullError};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;

/// Message returned whenever the platform does not look logged in.
pub const LOGIN_REQUIRED_MESSAGE: &str = "Login to web.sensibull.com first";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the platform probe.
#[derive(Debug, Clone)]
pub struct SensibullClientConfig {
    /// Platform base URL; the probe requests `{base_url}/positions`.
    pub base_url: String,

    /// Browser-like User-Agent sent with the probe.
    pub user_agent: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SensibullClientConfig {
    fn default() -> Self {
        Self::from(&squareoff_core::PlatformConfig::default())
    }
}

impl From<&squareoff_core::PlatformConfig> for SensibullClientConfig {
    fn from(config: &squareoff_core::PlatformConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

impl SensibullClientConfig {
    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url: String = url.into();
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

// =============================================================================
// LoginStatus
// =============================================================================

/// Outcome of a login probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginStatus {
    pub logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LoginStatus {
    #[must_use]
    pub fn logged_in() -> Self {
        Self {
            logged_in: true,
            message: None,
        }
    }

    #[must_use]
    pub fn login_required() -> Self {
        Self {
            logged_in: false,
            message: Some(LOGIN_REQUIRED_MESSAGE.to_string()),
        }
    }

    /// Classifies a probe response.
    #[must_use]
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            return Self::login_required();
        }

        if status.is_success() && body.to_lowercase().contains("positions") {
            Self::logged_in()
        } else {
            Self::login_required()
        }
    }
}

// =============================================================================
// SensibullClient
// =============================================================================

/// HTTP client for the login probe.
#[derive(Debug, Clone)]
pub struct SensibullClient {
    http: Client,
    config: SensibullClientConfig,
}

impl SensibullClient {
    /// Creates a client.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: SensibullClientConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SensibullError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Fetches the positions page and classifies the response.
    ///
    /// # Errors
    /// Returns error only if the platform cannot be reached or the body
    /// cannot be read; any HTTP status is a classification, not an error.
    pub async fn check_login(&self) -> Result<LoginStatus> {
        let url = format!("{}/positions", self.config.base_url);
        tracing::debug!(%url, "probing platform login");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        tracing::info!(status = status.as_u16(), "platform probe response");

        if status == StatusCode::UNAUTHORIZED {
            return Ok(LoginStatus::login_required());
        }

        let body = response.text().await?;
        Ok(LoginStatus::from_response(status, &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SensibullClient {
        SensibullClient::new(SensibullClientConfig::default().with_base_url(server.uri())).unwrap()
    }

    #[test]
    fn test_config_defaults_from_platform_config() {
        let config = SensibullClientConfig::default();
        assert_eq!(config.base_url, "https://web.sensibull.com");
        assert!(config.user_agent.contains("Chrome"));
    }

    #[test]
    fn test_with_base_url_strips_trailing_slash() {
        let config = SensibullClientConfig::default().with_base_url("http://localhost:9000/");
        assert_eq!(config.base_url, "http://localhost:9000");
    }

    #[test]
    fn test_classification() {
        assert!(!LoginStatus::from_response(StatusCode::UNAUTHORIZED, "positions").logged_in);
        assert!(LoginStatus::from_response(StatusCode::OK, "<title>My Positions</title>").logged_in);
        assert!(!LoginStatus::from_response(StatusCode::OK, "<title>Sign in</title>").logged_in);
        assert!(!LoginStatus::from_response(StatusCode::FOUND, "positions").logged_in);
    }

    #[test]
    fn test_login_status_json_shape() {
        let json = serde_json::to_value(LoginStatus::logged_in()).unwrap();
        assert_eq!(json, serde_json::json!({ "loggedIn": true }));

        let json = serde_json::to_value(LoginStatus::login_required()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "loggedIn": false, "message": "Login to web.sensibull.com first" })
        );
    }

    #[tokio::test]
    async fn test_check_login_logged_in() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/positions"))
            .and(header("User-Agent", "Mozilla/5.0 squareoff-test"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html><title>Positions</title></html>"),
            )
            .mount(&mock_server)
            .await;

        let mut config = SensibullClientConfig::default().with_base_url(mock_server.uri());
        config.user_agent = "Mozilla/5.0 squareoff-test".to_string();
        let status = SensibullClient::new(config).unwrap().check_login().await.unwrap();
        assert_eq!(status, LoginStatus::logged_in());
    }

    #[tokio::test]
    async fn test_check_login_unauthorized() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/positions"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let status = client_for(&mock_server).check_login().await.unwrap();
        assert_eq!(status, LoginStatus::login_required());
    }

    #[tokio::test]
    async fn test_check_login_login_page() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/positions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>Sign in</html>"))
            .mount(&mock_server)
            .await;

        let status = client_for(&mock_server).check_login().await.unwrap();
        assert!(!status.logged_in);
        assert_eq!(status.message.as_deref(), Some(LOGIN_REQUIRED_MESSAGE));
    }

    #[tokio::test]
    async fn test_check_login_slow_platform_times_out() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/positions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("positions")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let mut config = SensibullClientConfig::default().with_base_url(mock_server.uri());
        config.timeout_secs = 1;
        let err = SensibullClient::new(config).unwrap().check_login().await.unwrap_err();
        assert!(matches!(err, SensibullError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_check_login_unreachable_is_error() {
        let client =
            SensibullClient::new(SensibullClientConfig::default().with_base_url("http://127.0.0.1:1"))
                .unwrap();

        let err = client.check_login().await.unwrap_err();
        assert!(matches!(err, SensibullError::Network(_) | SensibullError::Timeout(_)));
    }
}
