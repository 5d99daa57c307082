//! Request/response logging decorator for development
//!
//! Payloads are logged at `trace!` and truncated to
//! [`MAX_LOGGED_BODY_BYTES`]; header values are logged verbatim, so keep this
//! out of production builds that carry credentials in headers.

use async_trait::async_trait;
use courier_core::Transport;
use courier_domain::constants::MAX_LOGGED_BODY_BYTES;
use courier_domain::{Request, Response, TransportError};
use tracing::{debug, trace};

/// Wraps a transport and logs every exchange it performs
#[derive(Debug, Clone)]
pub struct LoggingTransport<T> {
    inner: T,
}

impl<T> LoggingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for LoggingTransport<T> {
    async fn execute(&self, request: &Request) -> Result<Response, TransportError> {
        trace!(request_id = %request.id, line = %request.request_line(), "request");
        for (name, value) in &request.headers {
            trace!(request_id = %request.id, "{name}: {value}");
        }
        if let Some(body) = &request.body {
            trace!(request_id = %request.id, body = %preview(body), "request body");
        }

        let result = self.inner.execute(request).await;

        match &result {
            Ok(response) => {
                debug!(
                    request_id = %request.id,
                    status = ?response.status_code,
                    reason = response.reason_phrase.as_deref().unwrap_or(""),
                    "response"
                );
                if let Some(body) = &response.body {
                    trace!(request_id = %request.id, body = %preview(body), "response body");
                }
            }
            Err(error) => debug!(request_id = %request.id, error = %error, "no response"),
        }
        result
    }
}

fn preview(body: &[u8]) -> String {
    if body.len() <= MAX_LOGGED_BODY_BYTES {
        return String::from_utf8_lossy(body).into_owned();
    }
    format!(
        "{}... ({} bytes total)",
        String::from_utf8_lossy(&body[..MAX_LOGGED_BODY_BYTES]),
        body.len()
    )
}
