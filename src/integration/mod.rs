//! Integration layer: configuration and component wiring

pub mod config;
pub mod relay;

pub use config::{Cli, RelayConfig, DEFAULT_CONTROL_PORT, DEFAULT_ENGINE_URL, DEFAULT_QUEUE_CAPACITY};
pub use relay::Relay;
