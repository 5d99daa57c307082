//! Attempt results and final outcomes
//!
//! Every attempt ends in exactly one of two ways: the transport produced a
//! [`Response`] (successful or not), or it failed with a [`TransportError`]
//! and no response exists. The two never coexist for a single attempt.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result of an attempt that reached the remote side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub succeeded: bool,
    pub status_code: Option<u16>,
    pub reason_phrase: Option<String>,
    pub body: Option<Vec<u8>>,
}

impl Response {
    /// Build a response from a status code. Only `2xx` counts as success.
    pub fn from_status(
        status_code: u16,
        reason_phrase: Option<String>,
        body: Option<Vec<u8>>,
    ) -> Self {
        Self {
            succeeded: (200..300).contains(&status_code),
            status_code: Some(status_code),
            reason_phrase,
            body,
        }
    }

    pub fn ok() -> Self {
        Self::from_status(200, Some("OK".to_string()), None)
    }

    /// Lossy UTF-8 view of the body for diagnostics
    pub fn body_text(&self) -> Option<String> {
        self.body.as_ref().map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

/// Fault raised by a transport that prevented any response
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("i/o error: {0}")]
    Io(String),

    #[error("transport failure: {0}")]
    Other(String),
}

impl TransportError {
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Connect(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Stable label for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connect(_) => "connect",
            Self::Timeout(_) => "timeout",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Protocol(_) => "protocol",
            Self::Io(_) => "io",
            Self::Other(_) => "other",
        }
    }
}

/// Why an attempt did not succeed, as seen by a retry policy
#[derive(Debug, Clone, Copy)]
pub enum AttemptFailure<'a> {
    /// The remote side answered, but not with a success status
    Unsuccessful(&'a Response),
    /// No response could be obtained
    Error(&'a TransportError),
}

impl<'a> AttemptFailure<'a> {
    /// Classify an attempt result. Returns `None` for a successful response.
    pub fn from_result(result: &'a Result<Response, TransportError>) -> Option<Self> {
        match result {
            Ok(response) if response.succeeded => None,
            Ok(response) => Some(Self::Unsuccessful(response)),
            Err(error) => Some(Self::Error(error)),
        }
    }

    pub fn response(&self) -> Option<&'a Response> {
        match self {
            Self::Unsuccessful(response) => Some(response),
            Self::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&'a TransportError> {
        match self {
            Self::Unsuccessful(_) => None,
            Self::Error(error) => Some(error),
        }
    }
}

/// Final result of a request's attempt loop, delivered to callbacks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// The last attempt produced a response, successful or not
    Response(Response),
    /// Every attempt that was made failed without a response
    NoResponse { error: TransportError },
}

impl Outcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Response(response) => Some(response),
            Self::NoResponse { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&TransportError> {
        match self {
            Self::Response(_) => None,
            Self::NoResponse { error } => Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.response().is_some_and(|response| response.succeeded)
    }

    /// Status code of the final response, if there was one
    pub fn status_code(&self) -> Option<u16> {
        self.response().and_then(|response| response.status_code)
    }
}

impl From<Result<Response, TransportError>> for Outcome {
    fn from(result: Result<Response, TransportError>) -> Self {
        match result {
            Ok(response) => Self::Response(response),
            Err(error) => Self::NoResponse { error },
        }
    }
}
