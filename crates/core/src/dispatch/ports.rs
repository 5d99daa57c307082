//! Port interfaces for request dispatch

use std::time::Duration;

use async_trait::async_trait;
use courier_domain::{AttemptFailure, Outcome, Request, Response, TransportError};
use tokio_util::sync::CancellationToken;

use super::entry::QueueEntry;
use super::error::DispatchResult;

/// Executes a single request attempt.
///
/// Implementations must not retry on their own; every retry decision is made
/// by the dispatcher's [`RetryPolicy`]. Timeouts belong here and surface as
/// [`TransportError::Timeout`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request once and report what happened
    async fn execute(&self, request: &Request) -> Result<Response, TransportError>;
}

/// Per-request retry decision object.
///
/// One instance is created when a request is first dispatched and dropped
/// when its attempt loop ends, so counters kept in `self` never leak across
/// requests.
pub trait RetryPolicy: Send {
    /// Called once after every failed attempt, never after a success.
    ///
    /// Returns whether the request should be attempted again.
    fn on_retry(&mut self, failure: AttemptFailure<'_>) -> bool;

    /// Delay before the next attempt, consulted after `on_retry` returned
    /// `true`.
    fn backoff(&self) -> Duration {
        Duration::ZERO
    }
}

/// Receives the final outcome of a request.
///
/// Errors and panics raised here are logged and swallowed; they never stop
/// the dispatch worker.
pub trait ResponseCallback: Send + Sync {
    /// Handle the final outcome of one request
    fn on_outcome(&self, outcome: &Outcome) -> anyhow::Result<()>;
}

/// Thread-safe FIFO holding entries waiting for dispatch
#[async_trait]
pub trait SubmissionQueue: Send + Sync {
    /// Append an entry. Never blocks.
    ///
    /// # Errors
    /// Returns `DispatchError::InvalidArgument` when the entry's request is
    /// invalid.
    fn enqueue(&self, entry: QueueEntry) -> DispatchResult<()>;

    /// Wait for the oldest entry.
    ///
    /// Returns `None` as soon as `cancel` fires. An entry is only removed
    /// from the queue when it is returned.
    async fn dequeue(&self, cancel: &CancellationToken) -> Option<QueueEntry>;

    /// Number of entries currently waiting
    fn len(&self) -> usize;

    /// Whether no entry is waiting
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
