//! Outbound request descriptor
//!
//! The dispatcher treats a [`Request`] as opaque: it validates that there is
//! something to send and passes it to the transport untouched.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{CourierError, Result};
use crate::impl_domain_enum_conversions;

/// HTTP-style request method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl_domain_enum_conversions!(Method {
    Get => "GET",
    Post => "POST",
    Put => "PUT",
    Patch => "PATCH",
    Delete => "DELETE",
    Head => "HEAD",
    Options => "OPTIONS",
});

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

/// A single outbound network operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Correlation id used in logs and metrics
    pub id: Uuid,
    pub method: Method,
    /// Absolute target, usually a URL
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            target: target.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::Get, target)
    }

    pub fn post(target: impl Into<String>) -> Self {
        Self::new(Method::Post, target)
    }

    pub fn put(target: impl Into<String>) -> Self {
        Self::new(Method::Put, target)
    }

    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(Method::Delete, target)
    }

    /// Append a header. Duplicate names are kept in insertion order.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// `"METHOD target"`, the form used in every log line about this request
    pub fn request_line(&self) -> String {
        format!("{} {}", self.method, self.target)
    }

    /// Reject requests that carry nothing to send.
    ///
    /// # Errors
    /// Returns `CourierError::InvalidInput` when the target is empty or only
    /// whitespace.
    pub fn validate(&self) -> Result<()> {
        if self.target.trim().is_empty() {
            return Err(CourierError::InvalidInput(format!(
                "request {} has an empty target",
                self.id
            )));
        }
        Ok(())
    }
}
