//! Conversions from external infrastructure errors into domain errors.

use std::error::Error as _;
use std::time::Duration;

use courier_domain::{CourierError, TransportError};
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub CourierError);

impl From<InfraError> for CourierError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<CourierError> for InfraError {
    fn from(value: CourierError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoCourierError {
    fn into_courier(self) -> CourierError;
}

/// Classify a failed attempt for the dispatcher's retry policy.
pub trait IntoTransportError {
    /// `timeout` is the limit the client was configured with; it is reported
    /// back in [`TransportError::Timeout`].
    fn into_transport_error(self, timeout: Duration) -> TransportError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → CourierError */
/* -------------------------------------------------------------------------- */

impl IntoCourierError for HttpError {
    /// Only client construction reports through `CourierError`; per-request
    /// failures go through [`IntoTransportError`] instead.
    fn into_courier(self) -> CourierError {
        if self.is_builder() {
            let detail = describe_chain(&self);
            CourierError::Config(format!("HTTP client configuration rejected: {detail}"))
        } else {
            CourierError::Network(describe_chain(&self))
        }
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_courier())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → TransportError */
/* -------------------------------------------------------------------------- */

impl IntoTransportError for HttpError {
    fn into_transport_error(self, timeout: Duration) -> TransportError {
        let detail = describe_chain(&self);

        if self.is_timeout() {
            TransportError::Timeout(timeout)
        } else if self.is_builder() {
            TransportError::InvalidRequest(detail)
        } else if self.is_connect() {
            TransportError::Connect(detail)
        } else if self.is_redirect() || self.is_body() || self.is_decode() {
            TransportError::Protocol(detail)
        } else if self.is_request() {
            TransportError::Io(detail)
        } else {
            TransportError::Other(detail)
        }
    }
}

/// `"outer: inner: root"`; reqwest hides the useful part in the source chain
fn describe_chain(err: &HttpError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use reqwest::Client;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn refused_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener); // release the port so that requests fail with ECONNREFUSED
        format!("http://{addr}")
    }

    #[test]
    fn rejected_client_configuration_maps_to_config() {
        let error = Client::builder().user_agent("courier\nagent").build().unwrap_err();

        let mapped: CourierError = InfraError::from(error).into();
        match mapped {
            CourierError::Config(msg) => assert!(msg.contains("configuration rejected")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refused_connection_maps_to_connect() {
        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(refused_url()).send().await.unwrap_err();

        let mapped = error.into_transport_error(Duration::from_secs(1));
        assert!(mapped.is_connect(), "expected connect error, got {mapped:?}");
    }

    #[tokio::test]
    async fn malformed_url_maps_to_invalid_request() {
        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get("not a url").build().unwrap_err();

        let mapped = error.into_transport_error(Duration::from_secs(1));
        assert!(matches!(mapped, TransportError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn slow_server_maps_to_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let limit = Duration::from_millis(50);
        let client = Client::builder().no_proxy().timeout(limit).build().unwrap();
        let error = client.get(server.uri()).send().await.unwrap_err();

        assert_eq!(error.into_transport_error(limit), TransportError::Timeout(limit));
    }
}
