//! Sensibull platform integration for squareoff.
//!
//! Answers one question: does the platform currently treat this process as
//! logged in? The check fetches the positions page and sniffs the body for
//! the word "positions". It is a heuristic, kept for the `/check-login`
//! route; the brokerage profile call is the authoritative session check.

pub mod client;
pub mod error;

pub use client::{LoginStatus, SensibullClient, SensibullClientConfig, LOGIN_REQUIRED_MESSAGE};
pub use error::{Result, SensibullError};
