//! Callback bindings and outcome notification
//!
//! A request may carry a callback either as a shared instance or as a
//! factory. Factories are resolved once, when the outcome is ready, so each
//! request gets its own freshly constructed callback.

use std::any::type_name;
use std::borrow::Cow;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use courier_domain::{CallbackMode, Outcome};
use tracing::{debug, error};
use uuid::Uuid;

use super::metrics::DispatchMetrics;
use super::ports::ResponseCallback;

type MakeCallback = dyn Fn() -> Box<dyn ResponseCallback> + Send + Sync;

/// Produces a fresh [`ResponseCallback`] per request
#[derive(Clone)]
pub struct CallbackFactory {
    name: Cow<'static, str>,
    make: Arc<MakeCallback>,
}

impl CallbackFactory {
    /// Factory named `name` that calls `make` for every request
    pub fn new<F, C>(name: impl Into<Cow<'static, str>>, make: F) -> Self
    where
        F: Fn() -> C + Send + Sync + 'static,
        C: ResponseCallback + 'static,
    {
        Self {
            name: name.into(),
            make: Arc::new(move || Box::new(make()) as Box<dyn ResponseCallback>),
        }
    }

    /// Factory for a callback type with a `Default` constructor
    pub fn of<C>() -> Self
    where
        C: ResponseCallback + Default + 'static,
    {
        Self::new(type_name::<C>(), C::default)
    }

    /// Construct a fresh callback
    pub fn create(&self) -> Box<dyn ResponseCallback> {
        (self.make)()
    }

    /// Label used in logs
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CallbackFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CallbackFactory").field(&self.name).finish()
    }
}

/// How a request names the callback that receives its outcome
#[derive(Clone)]
pub enum CallbackBinding {
    /// A ready instance, possibly shared between requests
    Instance(Arc<dyn ResponseCallback>),
    /// Constructed on demand for this request only
    Factory(CallbackFactory),
}

impl CallbackBinding {
    /// Wrap a ready callback
    pub fn instance<C>(callback: C) -> Self
    where
        C: ResponseCallback + 'static,
    {
        Self::Instance(Arc::new(callback))
    }

    /// Use a callback that the caller keeps a handle to
    pub fn shared(callback: Arc<dyn ResponseCallback>) -> Self {
        Self::Instance(callback)
    }

    /// Build a `C::default()` per request
    pub fn factory<C>() -> Self
    where
        C: ResponseCallback + Default + 'static,
    {
        Self::Factory(CallbackFactory::of::<C>())
    }

    /// Label safe to put in logs
    pub fn describe(&self) -> Cow<'_, str> {
        match self {
            Self::Instance(_) => Cow::Borrowed("instance"),
            Self::Factory(factory) => Cow::Owned(format!("factory({})", factory.name())),
        }
    }

    fn resolve(&self) -> Arc<dyn ResponseCallback> {
        match self {
            Self::Instance(callback) => Arc::clone(callback),
            Self::Factory(factory) => Arc::from(factory.create()),
        }
    }
}

impl fmt::Debug for CallbackBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl From<CallbackFactory> for CallbackBinding {
    fn from(factory: CallbackFactory) -> Self {
        Self::Factory(factory)
    }
}

/// Delivers final outcomes to callbacks without letting them hurt the worker
#[derive(Debug, Clone)]
pub struct CallbackNotifier {
    mode: CallbackMode,
    metrics: Arc<DispatchMetrics>,
}

impl CallbackNotifier {
    /// Notifier counting failures into `metrics`
    pub fn new(mode: CallbackMode, metrics: Arc<DispatchMetrics>) -> Self {
        Self { mode, metrics }
    }

    /// Configured invocation mode
    pub fn mode(&self) -> CallbackMode {
        self.mode
    }

    /// Hand `outcome` to the callback named by `binding`.
    ///
    /// In inline mode this returns after the callback has run. In detached
    /// mode the callback is moved to the blocking pool and this returns at
    /// once.
    pub fn notify(&self, binding: &CallbackBinding, request_id: Uuid, outcome: Outcome) {
        debug!(%request_id, callback = %binding.describe(), mode = %self.mode, "notifying callback");

        match self.mode {
            CallbackMode::Inline => invoke_guarded(binding, request_id, &outcome, &self.metrics),
            CallbackMode::Detached => {
                let binding = binding.clone();
                let metrics = Arc::clone(&self.metrics);
                // JoinHandle is dropped: the task runs to completion on its own
                drop(tokio::task::spawn_blocking(move || {
                    invoke_guarded(&binding, request_id, &outcome, &metrics);
                }));
            }
        }
    }
}

/// Builds (for factories) and runs the callback; neither step may unwind
/// into the caller.
fn invoke_guarded(
    binding: &CallbackBinding,
    request_id: Uuid,
    outcome: &Outcome,
    metrics: &DispatchMetrics,
) {
    match catch_unwind(AssertUnwindSafe(|| binding.resolve().on_outcome(outcome))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            metrics.record_callback_failure();
            error!(%request_id, error = %err, "callback returned an error");
        }
        Err(payload) => {
            metrics.record_callback_failure();
            error!(
                %request_id,
                callback = %binding.describe(),
                panic = %panic_message(payload.as_ref()),
                "callback panicked"
            );
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use courier_domain::{Response, TransportError};
    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Outcome>>,
    }

    impl ResponseCallback for Recorder {
        fn on_outcome(&self, outcome: &Outcome) -> anyhow::Result<()> {
            self.seen.lock().push(outcome.clone());
            Ok(())
        }
    }

    struct Failing;

    impl ResponseCallback for Failing {
        fn on_outcome(&self, _outcome: &Outcome) -> anyhow::Result<()> {
            anyhow::bail!("downstream rejected outcome")
        }
    }

    struct Panicking;

    impl ResponseCallback for Panicking {
        fn on_outcome(&self, _outcome: &Outcome) -> anyhow::Result<()> {
            panic!("callback blew up")
        }
    }

    struct Unbuildable;

    impl Default for Unbuildable {
        fn default() -> Self {
            panic!("callback constructor failed")
        }
    }

    impl ResponseCallback for Unbuildable {
        fn on_outcome(&self, _outcome: &Outcome) -> anyhow::Result<()> {
            Ok(())
        }
    }

    static CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);

    struct Counted;

    impl Default for Counted {
        fn default() -> Self {
            CONSTRUCTED.fetch_add(1, Ordering::SeqCst);
            Self
        }
    }

    impl ResponseCallback for Counted {
        fn on_outcome(&self, _outcome: &Outcome) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn notifier(mode: CallbackMode) -> (CallbackNotifier, Arc<DispatchMetrics>) {
        let metrics = Arc::new(DispatchMetrics::new());
        (CallbackNotifier::new(mode, Arc::clone(&metrics)), metrics)
    }

    #[test]
    fn inline_delivers_before_returning() {
        let (notifier, _) = notifier(CallbackMode::Inline);
        let recorder = Arc::new(Recorder::default());
        let binding = CallbackBinding::shared(recorder.clone());

        notifier.notify(&binding, Uuid::new_v4(), Outcome::Response(Response::ok()));

        assert_eq!(recorder.seen.lock().len(), 1);
    }

    #[test]
    fn errors_and_panics_are_contained() {
        let (notifier, metrics) = notifier(CallbackMode::Inline);
        let outcome = Outcome::NoResponse { error: TransportError::Timeout(Duration::from_secs(5)) };

        notifier.notify(&CallbackBinding::instance(Failing), Uuid::new_v4(), outcome.clone());
        notifier.notify(&CallbackBinding::instance(Panicking), Uuid::new_v4(), outcome);

        assert_eq!(metrics.snapshot().callback_failures, 2);
    }

    #[test]
    fn panicking_factory_is_contained() {
        let (notifier, metrics) = notifier(CallbackMode::Inline);

        notifier.notify(
            &CallbackBinding::factory::<Unbuildable>(),
            Uuid::new_v4(),
            Outcome::Response(Response::ok()),
        );

        assert_eq!(metrics.snapshot().callback_failures, 1);
    }

    #[test]
    fn factory_binding_constructs_per_notification() {
        let (notifier, _) = notifier(CallbackMode::Inline);
        let binding = CallbackBinding::factory::<Counted>();
        let before = CONSTRUCTED.load(Ordering::SeqCst);

        notifier.notify(&binding, Uuid::new_v4(), Outcome::Response(Response::ok()));
        notifier.notify(&binding, Uuid::new_v4(), Outcome::Response(Response::ok()));

        assert_eq!(CONSTRUCTED.load(Ordering::SeqCst) - before, 2);
    }

    #[test]
    fn describe_names_factories() {
        let binding = CallbackBinding::factory::<Recorder>();
        assert!(binding.describe().starts_with("factory("));
        assert!(binding.describe().contains("Recorder"));
        assert_eq!(CallbackBinding::instance(Failing).describe(), "instance");
    }

    #[tokio::test]
    async fn detached_runs_off_the_caller() {
        let (notifier, metrics) = notifier(CallbackMode::Detached);
        let recorder = Arc::new(Recorder::default());

        notifier.notify(
            &CallbackBinding::shared(recorder.clone()),
            Uuid::new_v4(),
            Outcome::Response(Response::ok()),
        );
        notifier.notify(
            &CallbackBinding::instance(Panicking),
            Uuid::new_v4(),
            Outcome::Response(Response::ok()),
        );
        notifier.notify(
            &CallbackBinding::factory::<Unbuildable>(),
            Uuid::new_v4(),
            Outcome::Response(Response::ok()),
        );

        for _ in 0..100 {
            if recorder.seen.lock().len() == 1 && metrics.snapshot().callback_failures == 2 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("detached callbacks did not complete");
    }
}
