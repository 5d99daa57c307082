//! Request, response and outcome types

pub mod request;
pub mod response;

pub use request::{Method, Request};
pub use response::{AttemptFailure, Outcome, Response, TransportError};
