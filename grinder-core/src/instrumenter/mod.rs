//! Instrumenters wrap a target under a [`Test`] so that its execution is
//! recorded.

use std::sync::Arc;

use derive_more::IsVariant;

use crate::{
    errors::{NonInstrumentableTypeError, NotWrappableTypeError},
    filter::{InstrumentationFilter, ALL_INSTRUMENTATION},
    object::Object,
    recorder::Recorder,
    test_case::Test,
};

pub use self::{
    composite::CompositeInstrumenter,
    dcr::{DcrInstrumenter, Stager},
    master::{MasterInstrumenter, RejectNullInstrumenter},
};

mod composite;
mod dcr;
mod master;

/// The result of [`Instrumenter::create_instrumented_proxy`].
#[derive(Debug, Clone, IsVariant)]
pub enum Wrapped {
    /// A new object standing in for the target.
    Proxied(Object),
    /// The target itself was instrumented, no proxy is needed.
    InPlace(Object),
    /// The instrumenter doesn't handle the target's type.
    Unsupported,
}

impl Wrapped {
    /// Returns the object to use instead of the target, if any.
    pub fn into_object(self) -> Option<Object> {
        match self {
            Self::Proxied(object) | Self::InPlace(object) => Some(object),
            Self::Unsupported => None,
        }
    }
}

/// Wraps targets so that their execution is recorded under a test.
///
/// "Not applicable" is signalled by [`Wrapped::Unsupported`] or `false`,
/// errors mean a genuine fault.
pub trait Instrumenter: Send + Sync {
    /// Produces an instrumented stand-in for `target`.
    fn create_instrumented_proxy(
        &self,
        test: &Test,
        recorder: &Arc<dyn Recorder>,
        target: &Object,
    ) -> Result<Wrapped, NotWrappableTypeError>;

    /// Instruments every member of `target`.
    ///
    /// Equivalent to `instrument_with(.., &ALL_INSTRUMENTATION)`.
    fn instrument(
        &self,
        test: &Test,
        recorder: &Arc<dyn Recorder>,
        target: &Object,
    ) -> Result<bool, NonInstrumentableTypeError> {
        self.instrument_with(test, recorder, target, &ALL_INSTRUMENTATION)
    }

    /// Instruments members of `target` selected by `filter`.
    ///
    /// Returns `true` if at least one member was instrumented and `false` if
    /// there is nothing to do.
    fn instrument_with(
        &self,
        test: &Test,
        recorder: &Arc<dyn Recorder>,
        target: &Object,
        filter: &dyn InstrumentationFilter,
    ) -> Result<bool, NonInstrumentableTypeError>;

    /// A human-readable identifier. `None` for internal instrumenters that
    /// shouldn't appear in diagnostics.
    fn description(&self) -> Option<String>;
}
