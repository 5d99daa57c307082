use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use courier_core::Transport;
use courier_domain::{Request, Response, TransportError};
use parking_lot::Mutex;
use tokio::sync::Notify;

/// Transport that replays scripted results and records every call.
///
/// When the script runs out, `fallback` is returned for every further call.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<Response, TransportError>>>,
    fallback: Result<Response, TransportError>,
    calls: Mutex<Vec<Request>>,
    delay: Duration,
    gate: Option<Arc<Notify>>,
}

impl ScriptedTransport {
    /// Every call succeeds with `200 OK`.
    pub fn succeeding() -> Self {
        Self::with_fallback(Ok(Response::ok()))
    }

    /// Every call returns `status`.
    pub fn responding(status: u16) -> Self {
        Self::with_fallback(Ok(Response::from_status(status, None, None)))
    }

    /// Every call fails with `error`.
    pub fn failing(error: TransportError) -> Self {
        Self::with_fallback(Err(error))
    }

    pub fn with_fallback(fallback: Result<Response, TransportError>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            calls: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            gate: None,
        }
    }

    /// Results returned, in order, before the fallback takes over.
    pub fn then(self, results: impl IntoIterator<Item = Result<Response, TransportError>>) -> Self {
        self.script.lock().extend(results);
        self
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Block every call until the gate is notified once per call.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Targets in the order the transport saw them.
    pub fn targets(&self) -> Vec<String> {
        self.calls.lock().iter().map(|request| request.target.clone()).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: &Request) -> Result<Response, TransportError> {
        self.calls.lock().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}
