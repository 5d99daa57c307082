//! Logging initialisation
//!
//! Installs a `tracing-subscriber` fmt layer filtered by `RUST_LOG` when it
//! is set, otherwise by the configured level.

use courier_domain::{CourierError, LoggingConfig};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// Returns `Ok(false)` when a subscriber was already installed, so calling
/// this twice is harmless.
///
/// # Errors
/// Returns `CourierError::Config` when the level is not a valid filter
/// directive.
pub fn init_tracing(config: &LoggingConfig) -> Result<bool, CourierError> {
    let filter = build_filter(config)?;

    let installed = if config.json {
        tracing_subscriber::registry().with(fmt::layer().json()).with(filter).try_init()
    } else {
        tracing_subscriber::registry().with(fmt::layer().with_target(true)).with(filter).try_init()
    };

    match installed {
        Ok(()) => {
            tracing::debug!(level = %config.level, json = config.json, "Tracing initialised");
            Ok(true)
        }
        Err(_) => Ok(false),
    }
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, CourierError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|e| CourierError::Config(format!("Invalid log level {:?}: {e}", config.level)))
}
