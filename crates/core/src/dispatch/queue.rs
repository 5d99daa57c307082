//! In-memory submission queue

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use super::entry::QueueEntry;
use super::error::DispatchResult;
use super::ports::SubmissionQueue;

/// Unbounded FIFO backed by a `VecDeque`.
///
/// The mutex only guards the buffer. Waking a blocked consumer goes through
/// `Notify`, and cancellation through the caller's token, so lifecycle
/// signalling never takes the queue lock.
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    entries: Mutex<VecDeque<QueueEntry>>,
    available: Notify,
}

impl InMemoryQueue {
    /// Empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests currently waiting, oldest first
    pub fn pending_requests(&self) -> Vec<courier_domain::Request> {
        self.entries.lock().iter().map(|entry| entry.request().clone()).collect()
    }
}

#[async_trait]
impl SubmissionQueue for InMemoryQueue {
    fn enqueue(&self, entry: QueueEntry) -> DispatchResult<()> {
        entry.validate()?;
        self.entries.lock().push_back(entry);
        // Stores a permit if no consumer is waiting yet
        self.available.notify_one();
        Ok(())
    }

    async fn dequeue(&self, cancel: &CancellationToken) -> Option<QueueEntry> {
        loop {
            if cancel.is_cancelled() {
                return None;
            }
            if let Some(entry) = self.entries.lock().pop_front() {
                return Some(entry);
            }
            tokio::select! {
                biased;
                () = cancel.cancelled() => return None,
                () = self.available.notified() => {}
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
