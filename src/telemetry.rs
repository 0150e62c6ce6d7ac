//! Tracing subscriber set-up.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::{Result, SgmError};

/// Builds the filter: `RUST_LOG` if set, else the configured level.
fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| SgmError::Telemetry(format!("invalid log level {:?}: {e}", config.level))),
    }
}

/// Installs the global tracing subscriber.
///
/// # Errors
///
/// Returns [`SgmError::Telemetry`] if the level is not a valid filter
/// directive or a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry
            .with(fmt::layer().json().with_current_span(true).with_span_list(true))
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };

    installed.map_err(|e| SgmError::Telemetry(e.to_string()))?;
    tracing::debug!(json = config.json, level = %config.level, "tracing initialised");
    Ok(())
}
