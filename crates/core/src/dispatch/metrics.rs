//! Dispatch counters
//!
//! ## Design
//! - **Relaxed atomics**: every counter is independent, nothing is derived
//!   from two counters at once
//! - **Snapshots** are plain serialisable structs for status reporting

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Counters updated by the dispatch worker and the submission API
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Entries accepted by `submit*`
    pub submitted: AtomicU64,
    /// Entries taken off the queue by the worker
    pub dispatched: AtomicU64,
    /// Transport invocations
    pub attempts: AtomicU64,
    /// Retries granted by policies
    pub retries: AtomicU64,
    /// Requests whose final outcome was a successful response
    pub succeeded: AtomicU64,
    /// Requests whose final outcome was an unsuccessful response
    pub failed: AtomicU64,
    /// Requests whose final outcome had no response at all
    pub no_response: AtomicU64,
    /// Callbacks that returned an error or panicked
    pub callback_failures: AtomicU64,
    /// Attempt loops cut short by a stop request
    pub abandoned: AtomicU64,
}

impl DispatchMetrics {
    /// All counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an accepted submission
    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Count an entry taken off the queue
    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one transport invocation
    pub fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a retry granted by a policy
    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a callback error or panic
    pub fn record_callback_failure(&self) {
        self.callback_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Count an attempt loop cut short by a stop request
    pub fn record_abandoned(&self) {
        self.abandoned.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the final outcome of one request
    pub fn record_outcome(&self, outcome: &courier_domain::Outcome) {
        let counter = match outcome.response() {
            Some(response) if response.succeeded => &self.succeeded,
            Some(_) => &self.failed,
            None => &self.no_response,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy every counter
    pub fn snapshot(&self) -> DispatchMetricsSnapshot {
        DispatchMetricsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            no_response: self.no_response.load(Ordering::Relaxed),
            callback_failures: self.callback_failures.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`DispatchMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchMetricsSnapshot {
    pub submitted: u64,
    pub dispatched: u64,
    pub attempts: u64,
    pub retries: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub no_response: u64,
    pub callback_failures: u64,
    pub abandoned: u64,
}

impl DispatchMetricsSnapshot {
    /// Requests whose attempt loop has finished
    pub fn completed(&self) -> u64 {
        self.succeeded + self.failed + self.no_response
    }
}
