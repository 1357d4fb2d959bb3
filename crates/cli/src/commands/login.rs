//! Login and session checks.

use anyhow::Result;
use squareoff_core::AppConfig;
use squareoff_kite::KiteError;
use squareoff_sensibull::{SensibullClient, SensibullClientConfig};

/// Probes the trading platform's positions page.
pub async fn run_check_login(config: &AppConfig) -> Result<()> {
    let client = SensibullClient::new(SensibullClientConfig::from(&config.platform))?;
    let status = client.check_login().await?;

    if status.logged_in {
        println!("Logged in to {}", client.base_url());
    } else {
        println!(
            "Not logged in: {}",
            status.message.as_deref().unwrap_or("unknown")
        );
    }

    Ok(())
}

/// Checks the brokerage session with the profile endpoint.
pub async fn run_session(config: &AppConfig) -> Result<()> {
    let client = super::kite_client(config)?;

    match client.get_profile().await {
        Ok(profile) => {
            println!(
                "Session valid for {} ({})",
                profile.user_id,
                profile.user_name.as_deref().unwrap_or("-")
            );
            Ok(())
        }
        Err(KiteError::Authentication(message)) => {
            println!("Session expired: {message}");
            println!("Log in again: {}", client.login_url());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
