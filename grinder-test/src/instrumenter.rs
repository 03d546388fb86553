use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use grinder_core::{
    InstrumentationFilter, Instrumenter, NonInstrumentableTypeError, NotWrappableTypeError,
    Object, Recorder, Test, Wrapped,
};

/// How a [`StubInstrumenter`] answers every request.
#[derive(Debug, Clone)]
pub enum StubAnswer {
    /// Handles the target in place.
    Claim,
    /// Handles the target by returning the provided proxy.
    Proxy(Object),
    /// Doesn't handle the target.
    Pass,
    /// Fails with the provided reason.
    Fail(String),
}

/// An instrumenter with a fixed answer that counts its calls.
pub struct StubInstrumenter {
    answer: StubAnswer,
    description: Option<String>,
    calls: AtomicUsize,
}

impl StubInstrumenter {
    /// Creates an instrumenter always answering `answer`.
    pub fn new(answer: StubAnswer) -> Self {
        Self {
            answer,
            description: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sets the description, `None` by default.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Wraps into an `Arc` to keep a handle after passing it to a composite.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// The number of `create_instrumented_proxy` and `instrument_with` calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Instrumenter for StubInstrumenter {
    fn create_instrumented_proxy(
        &self,
        _test: &Test,
        _recorder: &Arc<dyn Recorder>,
        target: &Object,
    ) -> Result<Wrapped, NotWrappableTypeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match &self.answer {
            StubAnswer::Claim => Ok(Wrapped::InPlace(target.clone())),
            StubAnswer::Proxy(proxy) => Ok(Wrapped::Proxied(proxy.clone())),
            StubAnswer::Pass => Ok(Wrapped::Unsupported),
            StubAnswer::Fail(reason) => Err(NotWrappableTypeError::new(reason.as_str())),
        }
    }

    fn instrument_with(
        &self,
        _test: &Test,
        _recorder: &Arc<dyn Recorder>,
        _target: &Object,
        _filter: &dyn InstrumentationFilter,
    ) -> Result<bool, NonInstrumentableTypeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match &self.answer {
            StubAnswer::Claim | StubAnswer::Proxy(_) => Ok(true),
            StubAnswer::Pass => Ok(false),
            StubAnswer::Fail(reason) => Err(NonInstrumentableTypeError::new(reason.as_str())),
        }
    }

    fn description(&self) -> Option<String> {
        self.description.clone()
    }
}
