//! Logging Module
//!
//! Initializes the tracing subscriber for application logs. The configured
//! level acts as the default; `RUST_LOG` overrides it when set.

use crate::config::LoggingConfig;
use crate::{Result, StaError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| StaError::ConfigError(format!("failed to initialize logging: {}", e)))
}
