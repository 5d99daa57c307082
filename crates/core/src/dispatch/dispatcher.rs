//! Order-preserving dispatcher
//!
//! Producers call `submit*` from any thread; a single worker task drains the
//! queue and runs each entry's attempt loop to completion before touching
//! the next one.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use courier_core::dispatch::{Dispatcher, RetryPolicyFactory, Transport};
//! use courier_domain::Request;
//!
//! # async fn example(transport: Arc<dyn Transport>) -> Result<(), courier_core::dispatch::DispatchError> {
//! let dispatcher = Dispatcher::builder()
//!     .transport(transport)
//!     .default_retry_policy(RetryPolicyFactory::default_policy(3))
//!     .build()?;
//!
//! dispatcher.submit(Request::post("https://api.example.test/events"))?;
//! dispatcher.start();
//! // ... application runs ...
//! dispatcher.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Stopping
//! `stop()` lets the attempt in progress finish, then the worker exits. If
//! the stop lands between two attempts of the same request, no further
//! attempt is made and the callback receives the last attempt's outcome.
//! Entries still in the queue stay there for the next `start()`.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use courier_domain::constants::DEFAULT_JOIN_TIMEOUT_MS;
use courier_domain::{
    AttemptFailure, CallbackMode, DispatcherConfig, Outcome, Request, Response, TransportError,
};
use futures::FutureExt;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};

use super::callback::{panic_message, CallbackBinding, CallbackNotifier};
use super::entry::{EntryRetry, QueueEntry};
use super::error::{DispatchError, DispatchResult};
use super::lifecycle::{LifecycleController, LifecycleState};
use super::metrics::{DispatchMetrics, DispatchMetricsSnapshot};
use super::ports::{RetryPolicy, SubmissionQueue, Transport};
use super::queue::InMemoryQueue;
use super::retry::RetryPolicyFactory;

/// State shared between the dispatcher handle and its worker
struct DispatchContext {
    transport: Arc<dyn Transport>,
    queue: Arc<dyn SubmissionQueue>,
    default_retry: Option<RetryPolicyFactory>,
    notifier: CallbackNotifier,
    metrics: Arc<DispatchMetrics>,
    /// Held by a worker for its whole lifetime; a restarted worker waits here
    /// until its predecessor has finished the entry it was dispatching
    slot: Arc<tokio::sync::Mutex<()>>,
    in_flight: AtomicBool,
}

/// Diagnostic view of a dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatcherStatus {
    /// Lifecycle state
    pub state: LifecycleState,
    /// Entries waiting for dispatch
    pub queue_depth: usize,
    /// Whether an entry is mid-attempt-loop right now
    pub in_flight: bool,
    /// Counter snapshot
    pub metrics: DispatchMetricsSnapshot,
}

impl fmt::Display for DispatcherStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (queued: {}, in flight: {}, completed: {})",
            self.state,
            self.queue_depth,
            self.in_flight,
            self.metrics.completed()
        )
    }
}

/// Serial dispatcher for outbound requests
pub struct Dispatcher {
    shared: Arc<DispatchContext>,
    runtime: Handle,
    lifecycle: LifecycleController,
    join_timeout: Duration,
}

impl Dispatcher {
    /// Start configuring a dispatcher
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Queue a request with no callback, using the default retry policy
    ///
    /// # Errors
    /// Returns `DispatchError::InvalidArgument` for an unusable request.
    pub fn submit(&self, request: Request) -> DispatchResult<()> {
        self.submit_entry(QueueEntry::new(request))
    }

    /// Queue a request whose outcome is reported to `callback`
    ///
    /// # Errors
    /// Returns `DispatchError::InvalidArgument` for an unusable request.
    pub fn submit_with_callback(
        &self,
        request: Request,
        callback: CallbackBinding,
    ) -> DispatchResult<()> {
        self.submit_entry(QueueEntry::new(request).with_callback(callback))
    }

    /// Queue a request with an optional callback and an optional retry
    /// policy; `None` for the policy means the dispatcher default applies.
    ///
    /// # Errors
    /// Returns `DispatchError::InvalidArgument` for an unusable request.
    pub fn submit_with(
        &self,
        request: Request,
        callback: Option<CallbackBinding>,
        retry: Option<RetryPolicyFactory>,
    ) -> DispatchResult<()> {
        let mut entry = QueueEntry::new(request);
        if let Some(callback) = callback {
            entry = entry.with_callback(callback);
        }
        if let Some(factory) = retry {
            entry = entry.with_retry_policy(factory);
        }
        self.submit_entry(entry)
    }

    /// Queue a fully built entry. Never blocks.
    ///
    /// # Errors
    /// Returns `DispatchError::InvalidArgument` for an unusable request.
    pub fn submit_entry(&self, entry: QueueEntry) -> DispatchResult<()> {
        entry.validate()?;
        let request_id = entry.request().id;
        self.shared.queue.enqueue(entry)?;
        self.shared.metrics.record_submitted();
        debug!(%request_id, queue_depth = self.shared.queue.len(), "request queued");
        Ok(())
    }

    /// Begin draining the queue. Returns `false` if already running.
    #[instrument(skip(self))]
    pub fn start(&self) -> bool {
        let shared = Arc::clone(&self.shared);
        let runtime = self.runtime.clone();
        let started = self
            .lifecycle
            .start_with(move |cancel| runtime.spawn(run_worker(shared, cancel)));

        if started {
            info!(queue_depth = self.queue_depth(), "Dispatcher started");
        } else {
            debug!("Dispatcher already running");
        }
        started
    }

    /// Ask the worker to stop. Returns `false` if it was not running.
    ///
    /// Does not wait; use [`shutdown`](Self::shutdown) to join the worker.
    #[instrument(skip(self))]
    pub fn stop(&self) -> bool {
        let stopped = self.lifecycle.stop();
        if stopped {
            info!(queue_depth = self.queue_depth(), "Dispatcher stopping");
        } else {
            debug!("Dispatcher not running");
        }
        stopped
    }

    /// Stop and wait for every worker to exit, bounded by the join timeout.
    ///
    /// After a quick `stop(); start(); stop()` the earlier worker may still be
    /// finishing its attempt; it is joined along with the latest one.
    ///
    /// # Errors
    /// Returns `DispatchError::Timeout` if a worker is still busy when the
    /// join timeout elapses, or `DispatchError::TaskJoinFailed` if one
    /// panicked.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> DispatchResult<()> {
        self.stop();

        let workers = self.lifecycle.take_workers();
        if workers.is_empty() {
            return Ok(());
        }

        match tokio::time::timeout(self.join_timeout, futures::future::join_all(workers)).await {
            Ok(results) => match results.into_iter().find_map(Result::err) {
                None => {
                    info!("Dispatcher stopped");
                    Ok(())
                }
                Some(e) => {
                    warn!(error = %e, "Dispatch worker failed");
                    Err(DispatchError::TaskJoinFailed(e.to_string()))
                }
            },
            Err(_) => {
                warn!(
                    join_timeout_ms = duration_millis(self.join_timeout),
                    "Dispatch worker did not complete within timeout"
                );
                Err(DispatchError::Timeout { millis: duration_millis(self.join_timeout) })
            }
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Whether the worker is draining the queue
    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    /// Entries waiting for dispatch
    pub fn queue_depth(&self) -> usize {
        self.shared.queue.len()
    }

    /// Counter snapshot
    pub fn metrics(&self) -> DispatchMetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// State, queue depth, in-flight flag and counters in one view
    pub fn status(&self) -> DispatcherStatus {
        DispatcherStatus {
            state: self.state(),
            queue_depth: self.queue_depth(),
            in_flight: self.shared.in_flight.load(Ordering::Acquire),
            metrics: self.metrics(),
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("status", &self.status())
            .field("default_retry", &self.shared.default_retry)
            .field("callback_mode", &self.shared.notifier.mode())
            .field("join_timeout", &self.join_timeout)
            .finish_non_exhaustive()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if self.lifecycle.is_running() {
            warn!("Dispatcher dropped while running; cancelling worker");
            self.lifecycle.stop();
        }
    }
}

/// Builder for [`Dispatcher`]. Later calls override earlier ones.
#[derive(Default)]
pub struct DispatcherBuilder {
    transport: Option<Arc<dyn Transport>>,
    runtime: Option<Handle>,
    queue: Option<Arc<dyn SubmissionQueue>>,
    default_retry: Option<RetryPolicyFactory>,
    callback_mode: CallbackMode,
    join_timeout: Option<Duration>,
}

impl DispatcherBuilder {
    /// Transport executing each attempt (required)
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Runtime the worker and detached callbacks are spawned on
    #[must_use]
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Queue to drain; defaults to a fresh [`InMemoryQueue`]
    #[must_use]
    pub fn queue(mut self, queue: Arc<dyn SubmissionQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Policy for entries that do not name their own
    #[must_use]
    pub fn default_retry_policy(mut self, factory: RetryPolicyFactory) -> Self {
        self.default_retry = Some(factory);
        self
    }

    /// Where callbacks run
    #[must_use]
    pub fn callback_mode(mut self, mode: CallbackMode) -> Self {
        self.callback_mode = mode;
        self
    }

    /// Upper bound on how long `shutdown` waits for workers
    #[must_use]
    pub fn join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = Some(timeout);
        self
    }

    /// Apply every dispatcher setting from configuration.
    ///
    /// `max_retries: None` clears any default retry policy set earlier.
    #[must_use]
    pub fn config(mut self, config: &DispatcherConfig) -> Self {
        self.default_retry = config.max_retries.map(RetryPolicyFactory::default_policy);
        self.callback_mode = config.callback_mode;
        self.join_timeout = Some(Duration::from_millis(config.join_timeout_ms));
        self
    }

    /// Assemble the dispatcher in the `Idle` state
    ///
    /// # Errors
    /// Returns `DispatchError::InvalidArgument` when no transport was given,
    /// or when no runtime was given and none is current.
    pub fn build(self) -> DispatchResult<Dispatcher> {
        let transport = self
            .transport
            .ok_or_else(|| DispatchError::InvalidArgument("transport is required".to_string()))?;

        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|e| {
                DispatchError::InvalidArgument(format!("no runtime to run the dispatch worker: {e}"))
            })?,
        };

        let queue = self.queue.unwrap_or_else(|| Arc::new(InMemoryQueue::new()));
        let metrics = Arc::new(DispatchMetrics::new());

        Ok(Dispatcher {
            shared: Arc::new(DispatchContext {
                transport,
                queue,
                default_retry: self.default_retry,
                notifier: CallbackNotifier::new(self.callback_mode, Arc::clone(&metrics)),
                metrics,
                slot: Arc::new(tokio::sync::Mutex::new(())),
                in_flight: AtomicBool::new(false),
            }),
            runtime,
            lifecycle: LifecycleController::new(),
            join_timeout: self
                .join_timeout
                .unwrap_or(Duration::from_millis(DEFAULT_JOIN_TIMEOUT_MS)),
        })
    }
}

/// Worker body: one entry at a time until cancelled
async fn run_worker(ctx: Arc<DispatchContext>, cancel: CancellationToken) {
    let _slot = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            debug!("Dispatch worker cancelled before it started");
            return;
        }
        guard = Arc::clone(&ctx.slot).lock_owned() => guard,
    };

    let mut exit = WorkerExit { ctx: &ctx, cancel: &cancel, finished: false };
    debug!("Dispatch worker running");
    while let Some(entry) = ctx.queue.dequeue(&cancel).await {
        ctx.dispatch_entry(entry, &cancel).await;
    }
    exit.finished = true;
    debug!("Dispatch worker exiting");
}

/// Restores shared state when the worker future is dropped before reaching
/// the end of its loop, which is how a panic inside it surfaces.
struct WorkerExit<'a> {
    ctx: &'a DispatchContext,
    cancel: &'a CancellationToken,
    finished: bool,
}

impl Drop for WorkerExit<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        error!("Dispatch worker ended abnormally; dispatcher marked stopped");
        self.ctx.in_flight.store(false, Ordering::Release);
        // Lets `LifecycleController` see the worker as gone
        self.cancel.cancel();
    }
}

impl DispatchContext {
    async fn dispatch_entry(&self, entry: QueueEntry, cancel: &CancellationToken) {
        let (request, callback, retry) = entry.into_parts();
        self.metrics.record_dispatched();
        self.in_flight.store(true, Ordering::Release);

        let span = info_span!(
            "dispatch",
            request_id = %request.id,
            method = %request.method,
            target = %request.target,
        );
        let outcome = self.run_attempts(&request, retry, cancel).instrument(span).await;
        self.metrics.record_outcome(&outcome);

        if let Some(binding) = callback {
            self.notifier.notify(&binding, request.id, outcome);
        }
        self.in_flight.store(false, Ordering::Release);
    }

    /// Attempt loop for one request; attempts are numbered from 1
    async fn run_attempts(
        &self,
        request: &Request,
        retry: EntryRetry,
        cancel: &CancellationToken,
    ) -> Outcome {
        let factory = match &retry {
            EntryRetry::Inherit => self.default_retry.as_ref(),
            EntryRetry::Disabled => None,
            EntryRetry::Policy(factory) => Some(factory),
        };
        let mut policy: Option<Box<dyn RetryPolicy>> =
            factory.and_then(|factory| guard_policy("create", || factory.create()));

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            self.metrics.record_attempt();
            let result = self.execute_attempt(request).await;

            let retry = match AttemptFailure::from_result(&result) {
                None => {
                    debug!(attempt, "Attempt succeeded");
                    false
                }
                Some(failure) => {
                    match failure {
                        AttemptFailure::Unsuccessful(response) => {
                            warn!(attempt, status = ?response.status_code, "Attempt unsuccessful");
                        }
                        AttemptFailure::Error(error) => {
                            warn!(attempt, error = %error, kind = error.kind(), "Attempt failed");
                        }
                    }
                    policy.as_mut().is_some_and(|policy| {
                        guard_policy("on_retry", || policy.on_retry(failure)).unwrap_or(false)
                    })
                }
            };

            if !retry {
                return Outcome::from(result);
            }

            let delay = match policy.as_ref() {
                None => Duration::ZERO,
                Some(policy) => match guard_policy("backoff", || policy.backoff()) {
                    Some(delay) => delay,
                    None => return Outcome::from(result),
                },
            };
            self.metrics.record_retry();
            if !wait_before_retry(delay, cancel).await {
                self.metrics.record_abandoned();
                warn!(attempt, "Stop requested between attempts; reporting last outcome");
                return Outcome::from(result);
            }
        }
    }

    async fn execute_attempt(&self, request: &Request) -> Result<Response, TransportError> {
        match AssertUnwindSafe(self.transport.execute(request)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                error!("Transport panicked during attempt");
                Err(TransportError::Other("transport panicked".to_string()))
            }
        }
    }
}

/// Run caller-supplied retry policy code. A panic is logged and reported as
/// `None`, which the attempt loop treats as "no further retries".
fn guard_policy<T>(step: &'static str, f: impl FnOnce() -> T) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            error!(step, panic = %panic_message(payload.as_ref()), "Retry policy panicked");
            None
        }
    }
}

/// Sleep for `delay` unless cancelled. Returns `false` when cancelled.
async fn wait_before_retry(delay: Duration, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    if delay.is_zero() {
        return true;
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(delay) => true,
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
