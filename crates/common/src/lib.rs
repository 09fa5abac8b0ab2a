pub mod broker;
pub mod config;
pub mod error;
pub mod types;

pub use broker::{ExecutionClient, MarketDataClient};
pub use config::{Config, EngineConfig};
pub use error::{Error, Result};
pub use types::*;
