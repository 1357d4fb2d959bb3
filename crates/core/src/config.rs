use crate::position::Mode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub kite: KiteConfig,
    pub platform: PlatformConfig,
    pub positions: PositionsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served for any path the API does not route.
    pub static_dir: String,
    /// Upper bound on a single inbound request, outbound calls included.
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            static_dir: "public".to_string(),
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KiteConfig {
    pub api_url: String,
    /// Connect login page; `api_key` and `v` are appended for re-login links.
    pub login_url: String,
    pub timeout_secs: u64,
    pub orders_per_second: u32,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Environment variable holding the session access token.
    pub access_token_env: String,
}

impl Default for KiteConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.kite.trade".to_string(),
            login_url: "https://kite.zerodha.com/connect/login".to_string(),
            timeout_secs: 15,
            orders_per_second: 10,
            api_key_env: "KITE_API_KEY".to_string(),
            access_token_env: "KITE_ACCESS_TOKEN".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: "https://web.sensibull.com".to_string(),
            timeout_secs: 15,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

/// How live positions are grouped into underlyings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    /// Leading uppercase letters of the trading symbol.
    #[default]
    Prefix,
    /// Brokerage instrument dump, falling back to the prefix.
    Instruments,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionsConfig {
    pub mock_file: String,
    pub default_mode: Mode,
    pub grouping: Grouping,
    /// Exchange segment whose instrument dump feeds `Grouping::Instruments`.
    pub instruments_exchange: String,
}

impl Default for PositionsConfig {
    fn default() -> Self {
        Self {
            mock_file: "data/mock_positions.json".to_string(),
            default_mode: Mode::Demo,
            grouping: Grouping::Prefix,
            instruments_exchange: "NFO".to_string(),
        }
    }
}
