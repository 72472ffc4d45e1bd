//! Infrastructure layer: config loading, logging, and the HTTP gateway.

pub mod config;
pub mod gateway;
pub mod logging;

pub use config::{ConfigError, ConfigLoader};
pub use gateway::HttpGateway;
pub use logging::init_logging;
