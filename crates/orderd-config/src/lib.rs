//! Daemon configuration and logging setup.

mod config;
mod error;
mod logging;

pub use config::{Config, DEFAULT_LOG_LEVEL};
pub use error::{ConfigError, ConfigResult};
pub use logging::init_logging;
