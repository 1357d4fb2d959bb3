//! CLI commands for the squareoff backend.

pub mod exit;
pub mod login;
pub mod positions;

pub use exit::{run_exit, ExitArgs};
pub use login::{run_check_login, run_session};
pub use positions::{run_positions, PositionsArgs};

use squareoff_core::AppConfig;
use squareoff_kite::{KiteAuthConfig, KiteClient, KiteClientConfig, KiteCredentials};

/// Builds a brokerage client from config and the credentials in the
/// environment.
pub(crate) fn kite_client(config: &AppConfig) -> anyhow::Result<KiteClient> {
    let credentials = KiteCredentials::from_env(&KiteAuthConfig::from(&config.kite))?;
    Ok(KiteClient::new(KiteClientConfig::from(&config.kite), credentials)?)
}
