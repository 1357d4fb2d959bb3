//! Credentials for Kite Connect requests.
//!
//! Kite authenticates every call with `Authorization: token <api_key>:<access_token>`.
//! The access token comes from the daily login flow, which lives outside this
//! crate; here it is only read and attached.
//!
//! # Security
//!
//! - Credentials are read from environment variables at request time
//! - The access token is held in a `SecretString` and never logged

use crate::error::{KiteError, Result};
use secrecy::{ExposeSecret, SecretString};

/// Kite Connect API version sent with every request.
pub const KITE_API_VERSION: &str = "3";

// =============================================================================
// Configuration
// =============================================================================

/// Names of the environment variables holding the credentials.
#[derive(Debug, Clone)]
pub struct KiteAuthConfig {
    /// Environment variable name for the API key.
    pub api_key_env: String,

    /// Environment variable name for the session access token.
    pub access_token_env: String,
}

impl Default for KiteAuthConfig {
    fn default() -> Self {
        Self {
            api_key_env: "KITE_API_KEY".to_string(),
            access_token_env: "KITE_ACCESS_TOKEN".to_string(),
        }
    }
}

impl KiteAuthConfig {
    /// Sets custom environment variable names.
    #[must_use]
    pub fn with_env_vars(
        mut self,
        api_key_env: impl Into<String>,
        access_token_env: impl Into<String>,
    ) -> Self {
        self.api_key_env = api_key_env.into();
        self.access_token_env = access_token_env.into();
        self
    }
}

impl From<&squareoff_core::KiteConfig> for KiteAuthConfig {
    fn from(config: &squareoff_core::KiteConfig) -> Self {
        Self::default().with_env_vars(&config.api_key_env, &config.access_token_env)
    }
}

// =============================================================================
// KiteCredentials
// =============================================================================

/// API key and session token for one brokerage session.
pub struct KiteCredentials {
    api_key: String,
    access_token: SecretString,
}

impl std::fmt::Debug for KiteCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KiteCredentials")
            .field("api_key", &self.api_key)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

impl KiteCredentials {
    /// Creates credentials from an API key and access token.
    pub fn new(api_key: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            access_token: SecretString::from(access_token.into()),
        }
    }

    /// Reads credentials from the configured environment variables.
    ///
    /// # Errors
    /// Returns `KiteError::Configuration` if either variable is unset or empty.
    pub fn from_env(config: &KiteAuthConfig) -> Result<Self> {
        let api_key = read_env(&config.api_key_env)?;
        let access_token = read_env(&config.access_token_env)?;
        Ok(Self::new(api_key, access_token))
    }

    /// Returns the API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns the `Authorization` header value.
    #[must_use]
    pub fn authorization(&self) -> String {
        format!("token {}:{}", self.api_key, self.access_token.expose_secret())
    }
}

fn read_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(KiteError::Configuration(format!(
            "missing environment variable: {name}"
        ))),
    }
}

/// Builds the Connect login link used to re-establish an expired session.
#[must_use]
pub fn login_url(base: &str, api_key: &str) -> String {
    format!("{base}?api_key={api_key}&v={KITE_API_VERSION}")
}
