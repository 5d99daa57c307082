//! Request dispatch engine
//!
//! Submission queue, single dispatch worker, retry-policy protocol, callback
//! notification and the start/stop lifecycle.

pub mod callback;
pub mod dispatcher;
pub mod entry;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod ports;
pub mod queue;
pub mod retry;

pub use callback::{CallbackBinding, CallbackFactory, CallbackNotifier};
pub use dispatcher::{Dispatcher, DispatcherBuilder, DispatcherStatus};
pub use entry::{EntryRetry, QueueEntry};
pub use error::{DispatchError, DispatchResult};
pub use lifecycle::{LifecycleController, LifecycleState};
pub use metrics::{DispatchMetrics, DispatchMetricsSnapshot};
pub use ports::{ResponseCallback, RetryPolicy, SubmissionQueue, Transport};
pub use queue::InMemoryQueue;
pub use retry::{BackoffRetryPolicy, DefaultRetryPolicy, NeverRetry, RetryPolicyFactory};
