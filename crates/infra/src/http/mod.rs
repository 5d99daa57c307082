//! HTTP transport adapters

pub mod client;
pub mod logging;

pub use client::{HttpTransport, HttpTransportBuilder};
pub use logging::LoggingTransport;
