//! Dispatcher wiring from configuration

use std::sync::Arc;

use courier_core::{Dispatcher, Transport};
use courier_domain::{Config, CourierError, Result};

use crate::http::{HttpTransport, LoggingTransport};

/// Build a dispatcher backed by [`HttpTransport`] on the current runtime.
///
/// The transport is wrapped in [`LoggingTransport`] when
/// `transport.log_payloads` is set.
///
/// # Errors
/// Returns `CourierError::Config` if the HTTP client cannot be built, or
/// `CourierError::InvalidInput` when called outside a tokio runtime.
pub fn build_dispatcher(config: &Config) -> Result<Dispatcher> {
    let http = HttpTransport::from_config(&config.transport)?;
    let transport: Arc<dyn Transport> = if config.transport.log_payloads {
        Arc::new(LoggingTransport::new(http))
    } else {
        Arc::new(http)
    };

    let dispatcher = Dispatcher::builder()
        .transport(transport)
        .config(&config.dispatcher)
        .build()
        .map_err(CourierError::from)?;

    tracing::info!(
        max_retries = ?config.dispatcher.max_retries,
        callback_mode = %config.dispatcher.callback_mode,
        log_payloads = config.transport.log_payloads,
        "Dispatcher built from configuration"
    );
    Ok(dispatcher)
}
