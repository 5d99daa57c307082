use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use courier_core::{ResponseCallback, RetryPolicy};
use courier_domain::{AttemptFailure, Outcome};
use parking_lot::Mutex;

/// Callback that keeps every outcome it receives.
#[derive(Default)]
pub struct RecordingCallback {
    outcomes: Mutex<Vec<Outcome>>,
}

impl RecordingCallback {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn outcomes(&self) -> Vec<Outcome> {
        self.outcomes.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.outcomes.lock().len()
    }
}

impl ResponseCallback for RecordingCallback {
    fn on_outcome(&self, outcome: &Outcome) -> anyhow::Result<()> {
        self.outcomes.lock().push(outcome.clone());
        Ok(())
    }
}

/// Outcomes seen by `FreshCallback` instances, with the id of the instance
/// that saw them.
pub static FRESH_INSTANCES: AtomicUsize = AtomicUsize::new(0);
pub static FRESH_OUTCOMES: Mutex<Vec<(usize, Outcome)>> = parking_lot::const_mutex(Vec::new());

/// Callback built through a factory; each instance gets a distinct id.
pub struct FreshCallback {
    instance: usize,
}

impl Default for FreshCallback {
    fn default() -> Self {
        Self { instance: FRESH_INSTANCES.fetch_add(1, Ordering::SeqCst) }
    }
}

impl ResponseCallback for FreshCallback {
    fn on_outcome(&self, outcome: &Outcome) -> anyhow::Result<()> {
        FRESH_OUTCOMES.lock().push((self.instance, outcome.clone()));
        Ok(())
    }
}

/// Callback that always panics.
pub struct PanickingCallback;

impl ResponseCallback for PanickingCallback {
    fn on_outcome(&self, _outcome: &Outcome) -> anyhow::Result<()> {
        panic!("callback failure")
    }
}

/// Retry policy that grants exactly `k` retries for any failure, counting
/// how often it was consulted.
pub struct CountingPolicy {
    remaining: usize,
    consulted: Arc<AtomicUsize>,
}

impl CountingPolicy {
    pub fn new(k: usize, consulted: Arc<AtomicUsize>) -> Self {
        Self { remaining: k, consulted }
    }
}

impl RetryPolicy for CountingPolicy {
    fn on_retry(&mut self, _failure: AttemptFailure<'_>) -> bool {
        self.consulted.fetch_add(1, Ordering::SeqCst);
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// Callback whose constructor panics, for factory bindings.
pub struct UnbuildableCallback;

impl Default for UnbuildableCallback {
    fn default() -> Self {
        panic!("callback constructor failure")
    }
}

impl ResponseCallback for UnbuildableCallback {
    fn on_outcome(&self, _outcome: &Outcome) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Retry policy that panics when asked for a decision.
#[derive(Default)]
pub struct PanickingPolicy;

impl RetryPolicy for PanickingPolicy {
    fn on_retry(&mut self, _failure: AttemptFailure<'_>) -> bool {
        panic!("retry policy failure")
    }
}
