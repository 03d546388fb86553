//! The contract of a dynamic code rewriting ("DCR") engine.

use std::sync::Arc;

use derive_more::IsVariant;

use crate::{
    class::{Class, Member},
    errors::{NonInstrumentableTypeError, WeavingError},
    object::Object,
    recorder::Recorder,
};

/// Which invocation argument of a member plays the role of the instrumented
/// target.
///
/// Only invocations whose selected argument is (by identity) the registered
/// target are recorded. `Class` records every invocation of a static member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IsVariant)]
pub enum TargetSource {
    Class,
    FirstParameter,
    SecondParameter,
    ThirdParameter,
}

impl TargetSource {
    /// The index of the selected invocation argument, `None` for `Class`.
    pub fn parameter_index(self) -> Option<usize> {
        match self {
            Self::Class => None,
            Self::FirstParameter => Some(0),
            Self::SecondParameter => Some(1),
            Self::ThirdParameter => Some(2),
        }
    }

    /// Returns whether `member` has the selected argument.
    pub fn can_apply_to(self, member: &Member) -> bool {
        match self.parameter_index() {
            None => !member.kind().is_method(),
            Some(index) => index < member.parameters(),
        }
    }
}

/// A transactional registration surface of a weaving engine.
///
/// `add_*` calls stage changes, `apply_changes` commits everything staged
/// since the previous commit as one unit: either all staged requests become
/// active or `WeavingError` is returned. A failed commit discards the batch,
/// so callers must stage again.
///
/// Staging may be done by many instrumenters concurrently.
pub trait DcrContext: Send + Sync {
    /// Stages instrumentation of `constructor`, used to build instances of
    /// `target`.
    fn add_constructor(
        &self,
        target: &Class,
        constructor: &Member,
        recorder: Arc<dyn Recorder>,
    ) -> Result<(), NonInstrumentableTypeError>;

    /// Stages instrumentation of `method` for invocations where the argument
    /// selected by `source` is `target`.
    fn add_method(
        &self,
        source: TargetSource,
        target: &Object,
        method: &Member,
        recorder: Arc<dyn Recorder>,
    ) -> Result<(), NonInstrumentableTypeError>;

    /// Like [`DcrContext::add_method`], but both selected arguments must match.
    fn add_method_with_targets(
        &self,
        first: (TargetSource, &Object),
        second: (TargetSource, &Object),
        method: &Member,
        recorder: Arc<dyn Recorder>,
    ) -> Result<(), NonInstrumentableTypeError>;

    /// Returns whether members declared by `class` can be instrumented.
    /// Has no side effects.
    fn is_instrumentable(&self, class: &Class) -> bool;

    /// Commits all staged changes.
    fn apply_changes(&self) -> Result<(), WeavingError>;

    /// The number of staged batches discarded by failed commits so far.
    ///
    /// A failed commit discards changes staged by every caller, so a caller
    /// that reads the generation before staging can tell whether its changes
    /// survived until its own commit.
    fn generation(&self) -> u64 {
        0
    }

    /// Like [`DcrContext::apply_changes`], but fails if some batch has been
    /// discarded since `generation` was read. The staged changes are left
    /// untouched then.
    fn apply_changes_since(&self, generation: u64) -> Result<(), WeavingError> {
        let _ = generation;
        self.apply_changes()
    }
}
