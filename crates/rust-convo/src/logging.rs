//! Tracing subscriber installation.
//!
//! The library only emits `tracing` events; binaries and test harnesses
//! call [`init`] once to route them somewhere.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{ConvoError, Result};

/// Build the filter: `RUST_LOG` wins over the configured level.
fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| ConvoError::config(format!("invalid log level '{}': {e}", config.level))),
    }
}

/// Install a global subscriber for the given configuration.
///
/// Returns `Ok(false)` if a global subscriber was already installed.
pub fn init(config: &LoggingConfig) -> Result<bool> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init(),
    };

    Ok(installed.is_ok())
}
