#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use courier_core::ResponseCallback;
use courier_domain::Outcome;
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

/// Poll `condition` until it holds or five seconds elapse.
pub async fn eventually<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..500 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
