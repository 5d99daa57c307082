//! # Courier Infrastructure
//!
//! Infrastructure implementations of core dispatch ports.
//!
//! This crate contains:
//! - HTTP transport (reqwest) and a payload-logging decorator
//! - Configuration loading from environment and JSON/TOML files
//! - Tracing initialisation
//! - Error conversions from external crates
//!
//! ## Architecture
//! - Implements traits defined in `courier-core`
//! - Contains all "impure" code (network, filesystem, process environment)

pub mod bootstrap;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use bootstrap::build_dispatcher;
pub use errors::{InfraError, IntoTransportError};
pub use http::{HttpTransport, HttpTransportBuilder, LoggingTransport};
pub use observability::init_tracing;
