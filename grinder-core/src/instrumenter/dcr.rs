use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    dcr::DcrContext,
    errors::{NonInstrumentableTypeError, NotWrappableTypeError},
    filter::{InstrumentationFilter, ALL_INSTRUMENTATION},
    object::Object,
    recorder::Recorder,
    test_case::Test,
};

use super::{Instrumenter, Wrapped};

/// Decides which members of a target to instrument and stages them into a
/// [`DcrContext`].
pub trait Stager: Send + Sync {
    /// Stages instrumentation of the members of `target` selected by
    /// `filter`. Returns whether anything was staged.
    ///
    /// Fails if the type of `target` can't be instrumented at all.
    fn stage(
        &self,
        context: &dyn DcrContext,
        target: &Object,
        recorder: &Arc<dyn Recorder>,
        filter: &dyn InstrumentationFilter,
    ) -> Result<bool, NonInstrumentableTypeError>;

    /// A human-readable name of the staged mechanism.
    fn description(&self) -> Option<String>;
}

/// An [`Instrumenter`] built on a [`DcrContext`].
///
/// Owns the two-phase protocol: the [`Stager`] stages changes, then, only if
/// something was staged, the changes are committed with exactly one
/// [`DcrContext::apply_changes_since`] call. When `instrument_with` returns,
/// the requested instrumentation is either live or an error is returned, even
/// if a commit of another caller discarded the staged changes meanwhile.
///
/// Targets are instrumented in place, so proxy creation returns the target
/// itself.
pub struct DcrInstrumenter<S> {
    context: Arc<dyn DcrContext>,
    stager: S,
}

impl<S: Stager> DcrInstrumenter<S> {
    /// Creates an instrumenter staging with `stager` into `context`.
    pub fn new(context: Arc<dyn DcrContext>, stager: S) -> Self {
        Self { context, stager }
    }
}

impl<S: Stager> Instrumenter for DcrInstrumenter<S> {
    fn create_instrumented_proxy(
        &self,
        test: &Test,
        recorder: &Arc<dyn Recorder>,
        target: &Object,
    ) -> Result<Wrapped, NotWrappableTypeError> {
        if self.instrument_with(test, recorder, target, &ALL_INSTRUMENTATION)? {
            Ok(Wrapped::InPlace(target.clone()))
        } else {
            Ok(Wrapped::Unsupported)
        }
    }

    fn instrument_with(
        &self,
        test: &Test,
        recorder: &Arc<dyn Recorder>,
        target: &Object,
        filter: &dyn InstrumentationFilter,
    ) -> Result<bool, NonInstrumentableTypeError> {
        // Read before staging, a failed commit may drop what is staged below.
        let generation = self.context.generation();

        if !self.stager.stage(&*self.context, target, recorder, filter)? {
            return Ok(false);
        }

        debug!(test = %test, target = %target, "applying staged changes");

        self.context.apply_changes_since(generation).map_err(|err| {
            warn!(test = %test, target = %target, error = %err, "cannot apply changes");
            NonInstrumentableTypeError::from(err)
        })?;

        Ok(true)
    }

    fn description(&self) -> Option<String> {
        self.stager.description()
    }
}
