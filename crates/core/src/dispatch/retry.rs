//! Retry policies and the factories that mint them per request

use std::any::type_name;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use courier_domain::constants::{DEFAULT_MAX_RETRIES, MAX_BACKOFF_MS};
use courier_domain::AttemptFailure;
use tracing::debug;

use super::ports::RetryPolicy;

type MakePolicy = dyn Fn() -> Box<dyn RetryPolicy> + Send + Sync;

/// Produces a fresh [`RetryPolicy`] for every dispatched request.
///
/// Cheap to clone; clones share the same constructor.
#[derive(Clone)]
pub struct RetryPolicyFactory {
    name: Cow<'static, str>,
    make: Arc<MakePolicy>,
}

impl RetryPolicyFactory {
    /// Factory named `name` that calls `make` for every request
    pub fn new<F, P>(name: impl Into<Cow<'static, str>>, make: F) -> Self
    where
        F: Fn() -> P + Send + Sync + 'static,
        P: RetryPolicy + 'static,
    {
        Self { name: name.into(), make: Arc::new(move || Box::new(make()) as Box<dyn RetryPolicy>) }
    }

    /// Factory for a policy type with a `Default` constructor, named after the type
    pub fn of<P>() -> Self
    where
        P: RetryPolicy + Default + 'static,
    {
        Self::new(type_name::<P>(), P::default)
    }

    /// Default policy allowing `max_retries` retries of unsuccessful responses
    pub fn default_policy(max_retries: u32) -> Self {
        Self::new(format!("DefaultRetryPolicy(max_retries={max_retries})"), move || {
            DefaultRetryPolicy::new(max_retries)
        })
    }

    /// Construct a fresh policy
    pub fn create(&self) -> Box<dyn RetryPolicy> {
        (self.make)()
    }

    /// Label used in logs
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for RetryPolicyFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RetryPolicyFactory").field(&self.name).finish()
    }
}

/// Retries unsuccessful responses up to a fixed bound.
///
/// A transport error ends the loop at once: with no response there is
/// nothing to suggest a retry would fare better.
#[derive(Debug, Clone)]
pub struct DefaultRetryPolicy {
    max_retries: u32,
    retries: u32,
}

impl DefaultRetryPolicy {
    /// Grant at most `max_retries` retries
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries, retries: 0 }
    }

    /// Retries granted so far
    pub fn retries(&self) -> u32 {
        self.retries
    }
}

impl Default for DefaultRetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl RetryPolicy for DefaultRetryPolicy {
    fn on_retry(&mut self, failure: AttemptFailure<'_>) -> bool {
        match failure {
            AttemptFailure::Error(error) => {
                debug!(error = %error, "transport error, not retrying");
                false
            }
            AttemptFailure::Unsuccessful(response) => {
                if self.retries >= self.max_retries {
                    debug!(
                        status = ?response.status_code,
                        retries = self.retries,
                        "retry budget exhausted"
                    );
                    return false;
                }
                self.retries += 1;
                debug!(
                    status = ?response.status_code,
                    retry = self.retries,
                    max_retries = self.max_retries,
                    "retrying unsuccessful response"
                );
                true
            }
        }
    }
}

/// Retries every kind of failure with exponential backoff.
///
/// The delay before retry `n` is `base_delay * 2^(n-1)`, capped at
/// `max_delay`.
#[derive(Debug, Clone)]
pub struct BackoffRetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    retries: u32,
}

impl BackoffRetryPolicy {
    /// Grant at most `max_retries` retries, waiting `base_delay` before the
    /// first and doubling after that
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay: Duration::from_millis(MAX_BACKOFF_MS),
            retries: 0,
        }
    }

    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }
}

impl Default for BackoffRetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, Duration::from_millis(100))
    }
}

impl RetryPolicy for BackoffRetryPolicy {
    fn on_retry(&mut self, failure: AttemptFailure<'_>) -> bool {
        if self.retries >= self.max_retries {
            return false;
        }
        self.retries += 1;
        debug!(
            retry = self.retries,
            transport_error = failure.error().is_some(),
            "retrying with backoff"
        );
        true
    }

    fn backoff(&self) -> Duration {
        if self.retries == 0 {
            return Duration::ZERO;
        }
        let exponent = (self.retries - 1).min(31);
        self.base_delay.saturating_mul(1_u32 << exponent).min(self.max_delay)
    }
}

/// Declines every retry
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRetry;

impl RetryPolicy for NeverRetry {
    fn on_retry(&mut self, _failure: AttemptFailure<'_>) -> bool {
        false
    }
}
