use std::time::Duration;

use async_trait::async_trait;
use courier_core::Transport;
use courier_domain::constants::DEFAULT_HTTP_TIMEOUT_SECS;
use courier_domain::{CourierError, Request, Response, TransportConfig, TransportError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client as ReqwestClient, Method};
use tracing::debug;

use crate::errors::{InfraError, IntoTransportError};

/// Reqwest-backed transport. Each `execute` is exactly one HTTP exchange;
/// retries are left to the dispatcher.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: ReqwestClient,
    timeout: Duration,
}

impl HttpTransport {
    /// Start building a new HTTP transport.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    /// Convenience constructor with default configuration.
    ///
    /// # Errors
    /// Returns `CourierError::Config` if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, CourierError> {
        Self::builder().build()
    }

    /// # Errors
    /// Returns `CourierError::Config` for an unusable user agent.
    pub fn from_config(config: &TransportConfig) -> Result<Self, CourierError> {
        let mut builder = Self::builder().timeout(Duration::from_secs(config.timeout_secs));
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        builder.build()
    }

    fn prepare(&self, request: &Request) -> Result<reqwest::Request, TransportError> {
        let method = Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let mut headers = HeaderMap::with_capacity(request.headers.len());
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::InvalidRequest(format!("header {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::InvalidRequest(format!("header {name}: {e}")))?;
            headers.append(name, value);
        }

        let mut builder = self.client.request(method, request.target.as_str()).headers(headers);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        builder.build().map_err(|e| e.into_transport_error(self.timeout))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &Request) -> Result<Response, TransportError> {
        let http_request = self.prepare(request)?;
        debug!(request_id = %request.id, method = %request.method, url = %http_request.url(), "sending HTTP request");

        let response = self
            .client
            .execute(http_request)
            .await
            .map_err(|e| e.into_transport_error(self.timeout))?;

        let status = response.status();
        let reason = status.canonical_reason().map(str::to_string);
        let body = response.bytes().await.map_err(|e| e.into_transport_error(self.timeout))?;
        debug!(request_id = %request.id, %status, bytes = body.len(), "received HTTP response");

        Ok(Response::from_status(
            status.as_u16(),
            reason,
            (!body.is_empty()).then(|| body.to_vec()),
        ))
    }
}

/// Builder for [`HttpTransport`].
#[derive(Debug)]
pub struct HttpTransportBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    default_headers: Option<HeaderMap>,
    accept_invalid_certs: bool,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            user_agent: None,
            default_headers: None,
            accept_invalid_certs: false,
        }
    }
}

impl HttpTransportBuilder {
    /// Whole-exchange timeout, surfaced as `TransportError::Timeout`
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    #[must_use]
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    /// Test-only helper to allow insecure TLS (e.g., self-signed certs).
    #[cfg(test)]
    pub fn accept_invalid_certs(mut self, enabled: bool) -> Self {
        self.accept_invalid_certs = enabled;
        self
    }

    /// # Errors
    /// Returns `CourierError::Config` if reqwest rejects the settings.
    pub fn build(self) -> Result<HttpTransport, CourierError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        if self.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(|err| CourierError::from(InfraError::from(err)))?;

        Ok(HttpTransport { client, timeout: self.timeout })
    }
}
