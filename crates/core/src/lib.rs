//! Core types for the squareoff backend: positions, underlyings, the
//! demo/live mode, position aggregation, and configuration.

pub mod aggregator;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod position;
pub mod traits;
pub mod underlying;

pub use aggregator::{aggregate_live, aggregate_mock, aggregate_mock_with_rng, load_mock_file};
pub use config::{AppConfig, Grouping, KiteConfig, PlatformConfig, PositionsConfig, ServerConfig};
pub use config_loader::ConfigLoader;
pub use error::{CoreError, Result};
pub use position::{Leg, Mode, Underlying};
pub use traits::{PositionRecord, UnderlyingResolver};
pub use underlying::{InstrumentMap, PrefixResolver};
