//! Start/stop state machine for the dispatch worker
//!
//! `Idle -> Running -> Stopped -> Running -> ...`; there is no terminal
//! state. Every transition happens under one short `parking_lot` critical
//! section, separate from the queue's lock.

use courier_domain::impl_domain_enum_conversions;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Observable lifecycle state of a dispatcher
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Constructed, never started
    #[default]
    Idle,
    /// A worker is draining the queue
    Running,
    /// Stopped after running; may be started again
    Stopped,
}

impl_domain_enum_conversions!(LifecycleState {
    Idle => "idle",
    Running => "running",
    Stopped => "stopped",
});

#[derive(Debug, Default)]
struct Inner {
    state: LifecycleState,
    cancellation: Option<CancellationToken>,
    /// Every worker not yet joined, oldest first. A stopped worker may still
    /// be finishing its attempt after a newer one was started.
    workers: Vec<JoinHandle<()>>,
}

impl Inner {
    /// A worker that ends abnormally cancels its own token; fold that back
    /// into the state so the dispatcher can be started again.
    fn settle(&mut self) {
        if self.state == LifecycleState::Running
            && self.cancellation.as_ref().map_or(true, CancellationToken::is_cancelled)
        {
            self.cancellation = None;
            self.state = LifecycleState::Stopped;
        }
    }
}

/// Owns the running worker's cancellation token and join handles
#[derive(Debug, Default)]
pub struct LifecycleController {
    inner: Mutex<Inner>,
}

impl LifecycleController {
    /// Controller in the `Idle` state
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> LifecycleState {
        let mut inner = self.inner.lock();
        inner.settle();
        inner.state
    }

    /// Whether a worker is currently draining the queue
    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    /// Move to `Running`, spawning a worker with a fresh token.
    ///
    /// Returns `false` without calling `spawn` if already running.
    pub fn start_with<F>(&self, spawn: F) -> bool
    where
        F: FnOnce(CancellationToken) -> JoinHandle<()>,
    {
        let mut inner = self.inner.lock();
        inner.settle();
        if inner.state == LifecycleState::Running {
            return false;
        }

        let token = CancellationToken::new();
        let handle = spawn(token.clone());
        inner.workers.retain(|worker| !worker.is_finished());
        inner.workers.push(handle);
        inner.cancellation = Some(token);
        inner.state = LifecycleState::Running;
        true
    }

    /// Move to `Stopped`, cancelling the worker.
    ///
    /// Returns `false` if the dispatcher was not running. Join handles stay
    /// available through [`take_workers`](Self::take_workers).
    pub fn stop(&self) -> bool {
        let mut inner = self.inner.lock();
        inner.settle();
        if inner.state != LifecycleState::Running {
            return false;
        }

        if let Some(token) = inner.cancellation.take() {
            token.cancel();
        }
        inner.state = LifecycleState::Stopped;
        true
    }

    /// Hand over the join handles of every worker not joined yet.
    ///
    /// Empty while running: a live worker's handle stays put.
    pub fn take_workers(&self) -> Vec<JoinHandle<()>> {
        let mut inner = self.inner.lock();
        inner.settle();
        if inner.state == LifecycleState::Running {
            return Vec::new();
        }
        std::mem::take(&mut inner.workers)
    }
}
