//! HTTP surface for the squareoff backend.
//!
//! Routes:
//! - `GET /check-login` - platform login probe
//! - `GET /api/positions?mode=` - aggregated positions
//! - `POST /api/toggle-demo` - set or flip the demo flag
//! - `POST /api/exit` - square off an underlying
//! - `GET /api/session` - brokerage session check
//! - `GET /health` - liveness
//!
//! Anything else is served from the configured static directory.

pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use server::ApiServer;
pub use state::{AppState, ModeFlag};
