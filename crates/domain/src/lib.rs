//! # Courier Domain
//!
//! Data types shared by every Courier crate.
//!
//! This crate contains:
//! - Request / response / outcome types handed between producers, the
//!   dispatcher and transports
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other Courier crates
//! - No runtime or I/O dependencies

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
