//! Queued unit of work

use std::fmt;
use std::time::Instant;

use courier_domain::Request;

use super::callback::CallbackBinding;
use super::error::DispatchResult;
use super::retry::RetryPolicyFactory;

/// Which retry policy governs an entry's attempt loop
#[derive(Debug, Clone, Default)]
pub enum EntryRetry {
    /// Use the dispatcher's default factory; attempt once if it has none
    #[default]
    Inherit,
    /// Attempt exactly once
    Disabled,
    /// Use this factory
    Policy(RetryPolicyFactory),
}

impl From<Option<RetryPolicyFactory>> for EntryRetry {
    fn from(factory: Option<RetryPolicyFactory>) -> Self {
        factory.map_or(Self::Inherit, Self::Policy)
    }
}

/// A request together with how its outcome is reported and retried.
///
/// Immutable once built; the queue owns it until the worker dequeues it.
#[derive(Clone)]
pub struct QueueEntry {
    request: Request,
    callback: Option<CallbackBinding>,
    retry: EntryRetry,
    enqueued_at: Instant,
}

impl QueueEntry {
    /// Entry with no callback that inherits the dispatcher's retry policy
    pub fn new(request: Request) -> Self {
        Self { request, callback: None, retry: EntryRetry::Inherit, enqueued_at: Instant::now() }
    }

    /// Report the final outcome to `callback`
    #[must_use]
    pub fn with_callback(mut self, callback: CallbackBinding) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Govern retries with a policy built from `factory`
    #[must_use]
    pub fn with_retry_policy(mut self, factory: RetryPolicyFactory) -> Self {
        self.retry = EntryRetry::Policy(factory);
        self
    }

    /// Attempt once, ignoring any dispatcher default
    #[must_use]
    pub fn without_retries(mut self) -> Self {
        self.retry = EntryRetry::Disabled;
        self
    }

    /// Check the request before it is queued
    ///
    /// # Errors
    /// Returns `DispatchError::InvalidArgument` when the request is unusable.
    pub fn validate(&self) -> DispatchResult<()> {
        self.request.validate().map_err(Into::into)
    }

    /// Request to dispatch
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Callback receiving the outcome, if any
    pub fn callback(&self) -> Option<&CallbackBinding> {
        self.callback.as_ref()
    }

    /// Retry policy selection
    pub fn retry(&self) -> &EntryRetry {
        &self.retry
    }

    /// When the entry was built
    pub fn enqueued_at(&self) -> Instant {
        self.enqueued_at
    }

    /// Split into request, callback and retry selection
    pub fn into_parts(self) -> (Request, Option<CallbackBinding>, EntryRetry) {
        (self.request, self.callback, self.retry)
    }
}

impl fmt::Debug for QueueEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueEntry")
            .field("request_id", &self.request.id)
            .field("request", &self.request.request_line())
            .field("callback", &self.callback)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
