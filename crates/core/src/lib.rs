//! # Courier Core
//!
//! Dispatch engine and port definitions - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for transports, retry policies,
//!   callbacks and submission queues
//! - The order-preserving dispatcher and its lifecycle
//! - Shipped retry policies and the in-memory queue
//!
//! ## Architecture Principles
//! - Only depends on `courier-domain`
//! - No HTTP or platform code
//! - All external dependencies via traits

pub mod dispatch;

// Re-export the public surface
pub use dispatch::{
    BackoffRetryPolicy, CallbackBinding, CallbackFactory, DefaultRetryPolicy, DispatchError,
    DispatchMetricsSnapshot, DispatchResult, Dispatcher, DispatcherBuilder, DispatcherStatus,
    EntryRetry, InMemoryQueue, LifecycleState, NeverRetry, QueueEntry, ResponseCallback,
    RetryPolicy, RetryPolicyFactory, SubmissionQueue, Transport,
};
