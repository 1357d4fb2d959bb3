//! Kite Connect brokerage integration for squareoff.
//!
//! This crate provides:
//! - REST client for the Kite Connect v3 API with per-call timeouts
//! - Credential handling (API key + session access token)
//! - The Exit Executor that squares off every open leg of an underlying
//! - Data models for positions, orders, profile and instruments
//!
//! # Example
//!
//! ```ignore
//! use squareoff_kite::{ExitExecutor, KiteAuthConfig, KiteClient, KiteClientConfig, KiteCredentials};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let credentials = KiteCredentials::from_env(&KiteAuthConfig::default())?;
//!     let client = KiteClient::new(KiteClientConfig::default(), credentials)?;
//!
//!     let report = ExitExecutor::new(client).exit_underlying("NIFTY").await?;
//!     println!("{}", report.message());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Authentication
//!
//! Kite expects `Authorization: token <api_key>:<access_token>` on every call.
//! Set the following environment variables (names are configurable):
//!
//! - `KITE_API_KEY`: your Connect app's API key
//! - `KITE_ACCESS_TOKEN`: the access token from today's login
//!
//! # API Endpoints
//!
//! - `GET /portfolio/positions` - Get net and day positions
//! - `POST /orders/regular` - Place an order
//! - `GET /user/profile` - Get the user profile (session check)
//! - `GET /instruments/{exchange}` - Download the instrument dump (CSV)

pub mod auth;
pub mod client;
pub mod error;
pub mod executor;
pub mod types;

// Re-export main types for convenience
pub use auth::{login_url, KiteAuthConfig, KiteCredentials, KITE_API_VERSION};
pub use client::{
    parse_instruments, KiteClient, KiteClientConfig, KiteTransport, KITE_API_URL, KITE_LOGIN_URL,
};
pub use error::{KiteError, Result};
pub use executor::{
    dedup_positions, filter_open_legs, Brokerage, ExitExecutor, ExitOrder, ExitReport, LegOutcome,
    LegStatus, EXIT_ORDER_TAG,
};
pub use types::{
    Instrument, OrderRequest, OrderType, Position, PositionBook, Profile, TransactionType,
    Validity,
};
