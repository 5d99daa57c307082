use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use courier_core::{DispatchResult, InMemoryQueue, QueueEntry, SubmissionQueue};
use tokio_util::sync::CancellationToken;

/// Queue whose first `dequeue` panics; afterwards it behaves like
/// `InMemoryQueue`. No entry is removed by the failing call.
#[derive(Default)]
pub struct PanicOnceQueue {
    inner: InMemoryQueue,
    tripped: AtomicBool,
}

#[async_trait]
impl SubmissionQueue for PanicOnceQueue {
    fn enqueue(&self, entry: QueueEntry) -> DispatchResult<()> {
        self.inner.enqueue(entry)
    }

    async fn dequeue(&self, cancel: &CancellationToken) -> Option<QueueEntry> {
        if !self.tripped.swap(true, Ordering::SeqCst) {
            panic!("queue backend failure");
        }
        self.inner.dequeue(cancel).await
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}
