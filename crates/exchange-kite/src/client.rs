//! Kite Connect REST client.
//!
//! Every call carries the `X-Kite-Version` and `Authorization` headers and is
//! bounded by the configured timeout. Order placement additionally waits on a
//! governor rate limiter shared by every client built from the same
//! [`KiteTransport`].
//!
//! # Example
//!
//! ```ignore
//! use squareoff_kite::{KiteClient, KiteClientConfig, KiteCredentials, KiteAuthConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let credentials = KiteCredentials::from_env(&KiteAuthConfig::default())?;
//!     let client = KiteClient::new(KiteClientConfig::default(), credentials)?;
//!
//!     let book = client.get_positions().await?;
//!     println!("{} net positions", book.net.len());
//!
//!     Ok(())
//! }
//! ```

use crate::auth::{self, KiteCredentials, KITE_API_VERSION};
use crate::error::{KiteError, Result};
use crate::types::{Instrument, OrderPlaced, OrderRequest, PositionBook, Profile};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Constants
// =============================================================================

/// Kite Connect production API base URL.
pub const KITE_API_URL: &str = "https://api.kite.trade";

/// Kite Connect login page.
pub const KITE_LOGIN_URL: &str = "https://kite.zerodha.com/connect/login";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the Kite client.
#[derive(Debug, Clone)]
pub struct KiteClientConfig {
    /// Base URL for the API.
    pub base_url: String,

    /// Login page used for re-login links.
    pub login_url: String,

    /// Order placement limit.
    pub orders_per_second: NonZeroU32,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for KiteClientConfig {
    fn default() -> Self {
        Self {
            base_url: KITE_API_URL.to_string(),
            login_url: KITE_LOGIN_URL.to_string(),
            orders_per_second: nonzero!(10u32),
            timeout_secs: 15,
        }
    }
}

impl KiteClientConfig {
    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the order rate limit.
    #[must_use]
    pub fn with_rate_limit(mut self, orders_per_second: NonZeroU32) -> Self {
        self.orders_per_second = orders_per_second;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl From<&squareoff_core::KiteConfig> for KiteClientConfig {
    fn from(config: &squareoff_core::KiteConfig) -> Self {
        Self {
            base_url: config.api_url.clone(),
            login_url: config.login_url.clone(),
            orders_per_second: NonZeroU32::new(config.orders_per_second)
                .unwrap_or(nonzero!(10u32)),
            timeout_secs: config.timeout_secs,
        }
    }
}

// =============================================================================
// Transport
// =============================================================================

type OrderLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// HTTP client and order rate limiter, shared across sessions.
///
/// Cloning is cheap; clones share the connection pool and the limiter.
#[derive(Clone)]
pub struct KiteTransport {
    http: Client,
    order_limiter: Arc<OrderLimiter>,
}

impl std::fmt::Debug for KiteTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KiteTransport").finish_non_exhaustive()
    }
}

impl KiteTransport {
    /// Builds the HTTP client and limiter for a configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: &KiteClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| KiteError::Network(format!("failed to build HTTP client: {e}")))?;

        let quota = Quota::per_second(config.orders_per_second);

        Ok(Self {
            http,
            order_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }
}

// =============================================================================
// API Envelope
// =============================================================================

/// Every JSON response is wrapped as `{status, data}` or
/// `{status: "error", message, error_type}`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: Option<String>,
    data: Option<T>,
    message: Option<String>,
    error_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error_type: Option<String>,
}

// =============================================================================
// KiteClient
// =============================================================================

/// Kite Connect REST API client bound to one set of credentials.
pub struct KiteClient {
    config: KiteClientConfig,
    transport: KiteTransport,
    credentials: KiteCredentials,
}

impl std::fmt::Debug for KiteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KiteClient")
            .field("base_url", &self.config.base_url)
            .field("api_key", &self.credentials.api_key())
            .finish_non_exhaustive()
    }
}

impl KiteClient {
    /// Creates a client with its own transport.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: KiteClientConfig, credentials: KiteCredentials) -> Result<Self> {
        let transport = KiteTransport::new(&config)?;
        Ok(Self::with_transport(config, transport, credentials))
    }

    /// Creates a client that reuses an existing transport.
    #[must_use]
    pub fn with_transport(
        config: KiteClientConfig,
        transport: KiteTransport,
        credentials: KiteCredentials,
    ) -> Self {
        Self {
            config,
            transport,
            credentials,
        }
    }

    /// Returns the link that re-establishes this client's session.
    #[must_use]
    pub fn login_url(&self) -> String {
        auth::login_url(&self.config.login_url, self.credentials.api_key())
    }

    /// Validates a path segment such as an exchange code.
    fn validate_segment(segment: &str) -> Result<&str> {
        if segment.is_empty() {
            return Err(KiteError::InvalidOrder("segment cannot be empty".to_string()));
        }

        if !segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(KiteError::InvalidOrder(format!(
                "invalid segment: must contain only alphanumeric or underscore: {segment}"
            )));
        }

        if segment.len() > 16 {
            return Err(KiteError::InvalidOrder(format!(
                "invalid segment: exceeds maximum length of 16: {}",
                segment.len()
            )));
        }

        Ok(segment)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url, path);
        tracing::debug!(%method, %url, "kite request");

        self.transport
            .http
            .request(method, &url)
            .header("X-Kite-Version", KITE_API_VERSION)
            .header("Authorization", self.credentials.authorization())
    }

    /// Makes an authenticated GET request and unwraps the envelope.
    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .request(reqwest::Method::GET, path)
            .header("Accept", "application/json")
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Makes an authenticated form POST and unwraps the envelope.
    async fn post_form<T: serde::de::DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .request(reqwest::Method::POST, path)
            .header("Accept", "application/json")
            .form(body)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Converts non-success statuses and error envelopes into typed errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(1);
            return Err(KiteError::rate_limit(retry_after));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Self::error_from_body(status, &text));
        }

        let envelope: Envelope<T> = response.json().await?;

        if envelope.status.as_deref() == Some("error") {
            let body = ErrorBody {
                message: envelope.message,
                error_type: envelope.error_type,
            };
            return Err(Self::classify(status, body, String::new()));
        }

        envelope
            .data
            .ok_or_else(|| KiteError::Serialization("response has no data".to_string()))
    }

    fn error_from_body(status: StatusCode, text: &str) -> KiteError {
        let body: ErrorBody = serde_json::from_str(text).unwrap_or_default();
        Self::classify(status, body, text.to_string())
    }

    fn classify(status: StatusCode, body: ErrorBody, raw: String) -> KiteError {
        let message = body.message.unwrap_or(raw);
        let token_exception = body.error_type.as_deref() == Some("TokenException");

        if token_exception || status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
        {
            KiteError::Authentication(message)
        } else {
            KiteError::api(status.as_u16(), message)
        }
    }

    // =========================================================================
    // Portfolio Endpoints
    // =========================================================================

    /// Gets the `net` and `day` position sets.
    ///
    /// # Errors
    /// Returns `KiteError::Authentication` if the session is rejected, or
    /// another error if the API call fails.
    pub async fn get_positions(&self) -> Result<PositionBook> {
        self.get("/portfolio/positions").await
    }

    // =========================================================================
    // Order Endpoints
    // =========================================================================

    /// Places a regular order and returns its order ID.
    ///
    /// Waits on the shared order rate limiter first.
    ///
    /// # Errors
    /// Returns error if the order is rejected or the API call fails.
    pub async fn place_order(&self, order: &OrderRequest) -> Result<String> {
        if order.quantity == 0 {
            return Err(KiteError::InvalidOrder("quantity must be positive".to_string()));
        }

        self.transport.order_limiter.until_ready().await;

        let placed: OrderPlaced = self
            .post_form("/orders/regular", order)
            .await
            .map_err(|e| match e {
                KiteError::Api { message, .. } => KiteError::OrderRejected(message),
                other => other,
            })?;

        Ok(placed.order_id)
    }

    // =========================================================================
    // Account Endpoints
    // =========================================================================

    /// Gets the user profile; succeeds only with a valid session.
    ///
    /// # Errors
    /// Returns `KiteError::Authentication` if the session is rejected.
    pub async fn get_profile(&self) -> Result<Profile> {
        self.get("/user/profile").await
    }

    /// Downloads the instrument dump for an exchange segment.
    ///
    /// The endpoint returns CSV rather than a JSON envelope.
    ///
    /// # Errors
    /// Returns error if the segment is invalid, the API call fails, or the
    /// CSV cannot be parsed.
    pub async fn get_instruments(&self, exchange: &str) -> Result<Vec<Instrument>> {
        let exchange = Self::validate_segment(exchange)?;
        let response = self
            .request(reqwest::Method::GET, &format!("/instruments/{exchange}"))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(Self::error_from_body(status, &text));
        }

        parse_instruments(&text)
    }
}

/// Parses the CSV instrument dump, ignoring columns not in [`Instrument`].
///
/// # Errors
/// Returns `KiteError::Serialization` if a row cannot be decoded.
pub fn parse_instruments(csv_text: &str) -> Result<Vec<Instrument>> {
    let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
    let mut instruments = Vec::new();
    for row in reader.deserialize() {
        instruments.push(row?);
    }
    Ok(instruments)
}
