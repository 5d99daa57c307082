//! Shared test helpers for `courier-core` integration tests.
//!
//! Scripted transports and recording callbacks so dispatcher tests can focus
//! on ordering and retry behaviour instead of boilerplate.

#![allow(dead_code)]

pub mod callbacks;
pub mod queue;
pub mod transport;

use std::future::Future;
use std::time::Duration;

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Run `future` with a generous timeout so a hung dispatcher fails the test
/// instead of stalling the suite.
pub async fn within<T>(future: impl Future<Output = T>) -> T {
    match tokio::time::timeout(Duration::from_secs(5), future).await {
        Ok(value) => value,
        Err(_) => panic!("operation timed out"),
    }
}
