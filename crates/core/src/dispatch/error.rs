//! Dispatcher error types

use courier_domain::CourierError;
use thiserror::Error;

/// Errors surfaced synchronously by the dispatcher API.
///
/// Attempt failures never appear here; they are absorbed by the retry loop
/// and reported through callbacks.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A required collaborator is missing or a request is unusable
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The worker did not exit within the join timeout
    #[error("Dispatch worker did not stop within {millis}ms")]
    Timeout { millis: u64 },

    /// The worker task panicked or was aborted
    #[error("Dispatch worker join failed: {0}")]
    TaskJoinFailed(String),
}

impl From<CourierError> for DispatchError {
    fn from(err: CourierError) -> Self {
        match err {
            CourierError::InvalidInput(message) => Self::InvalidArgument(message),
            other => Self::InvalidArgument(other.to_string()),
        }
    }
}

impl From<DispatchError> for CourierError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::InvalidArgument(message) => CourierError::InvalidInput(message),
            DispatchError::Timeout { .. } | DispatchError::TaskJoinFailed(_) => {
                CourierError::Internal(err.to_string())
            }
        }
    }
}

/// Convenience type alias for dispatcher operations
pub type DispatchResult<T> = Result<T, DispatchError>;
