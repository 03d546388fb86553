//! Error conditions exchanged between instrumenters, weaving engines and
//! recorders.

use std::{error::Error as StdError, fmt};

use derive_more::{Display, Error};

use crate::{object::Object, test_case::Test};

/// The target's type cannot be wrapped by an instrumenter that was asked for
/// proxy semantics.
///
/// When the condition is a translated [`NonInstrumentableTypeError`], the
/// original error is kept as the source.
#[derive(Debug, Clone, Display)]
#[non_exhaustive]
#[display("not wrappable: {reason}")]
pub struct NotWrappableTypeError {
    /// Why the target can't be wrapped.
    pub reason: String,
    non_instrumentable: Option<NonInstrumentableTypeError>,
}

impl NotWrappableTypeError {
    /// Creates an error without a source.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            non_instrumentable: None,
        }
    }

    /// Returns the weaving failure this error was translated from, if any.
    pub fn weaving_error(&self) -> Option<&WeavingError> {
        self.non_instrumentable
            .as_ref()
            .and_then(NonInstrumentableTypeError::weaving_error)
    }
}

impl StdError for NotWrappableTypeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.non_instrumentable.as_ref().map(|err| err as _)
    }
}

impl From<NonInstrumentableTypeError> for NotWrappableTypeError {
    fn from(err: NonInstrumentableTypeError) -> Self {
        Self {
            reason: err.reason.clone(),
            non_instrumentable: Some(err),
        }
    }
}

/// The target's type or member cannot be instrumented at all.
///
/// Raised by [`Instrumenter::instrument_with`] and by every `add_*` operation of
/// [`DcrContext`]. When the condition is a translated [`WeavingError`], the
/// original error is kept as the source.
///
/// [`Instrumenter::instrument_with`]: crate::Instrumenter::instrument_with
/// [`DcrContext`]: crate::DcrContext
#[derive(Debug, Clone, Display)]
#[non_exhaustive]
#[display("non-instrumentable: {reason}")]
pub struct NonInstrumentableTypeError {
    /// Why the target can't be instrumented.
    pub reason: String,
    weaving: Option<WeavingError>,
}

impl NonInstrumentableTypeError {
    /// Creates an error without a source.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            weaving: None,
        }
    }

    /// Returns the weaving failure this error was translated from, if any.
    pub fn weaving_error(&self) -> Option<&WeavingError> {
        self.weaving.as_ref()
    }
}

impl StdError for NonInstrumentableTypeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.weaving.as_ref().map(|err| err as _)
    }
}

impl From<WeavingError> for NonInstrumentableTypeError {
    fn from(err: WeavingError) -> Self {
        Self {
            reason: format!("failed to apply changes: {}", err.reason),
            weaving: Some(err),
        }
    }
}

/// A staged batch could not be committed to the running process.
#[derive(Debug, Clone, Display, Error)]
#[non_exhaustive]
#[display("weaving failed: {reason}")]
pub struct WeavingError {
    /// Why the batch was rejected.
    pub reason: String,
}

impl WeavingError {
    /// Creates a new error.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A recorder could not start or end a unit of work.
#[derive(Debug, Clone, Display, Error)]
#[non_exhaustive]
#[display("recorder failed: {reason}")]
pub struct RecorderError {
    /// What went wrong.
    pub reason: String,
}

impl RecorderError {
    /// Creates a new error.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// The outcome of a failed call bracketed by recorders.
#[derive(Debug, Display)]
pub enum InvokeError<E> {
    /// A recorder failed; the body may not have run.
    #[display("{_0}")]
    Recorder(RecorderError),
    /// The body itself failed.
    #[display("{_0}")]
    Target(E),
}

impl<E> InvokeError<E> {
    /// Returns whether the error is the `Recorder` variant.
    #[inline]
    pub fn is_recorder(&self) -> bool {
        matches!(self, Self::Recorder(_))
    }

    /// Returns whether the error is the `Target` variant.
    #[inline]
    pub fn is_target(&self) -> bool {
        matches!(self, Self::Target(_))
    }

    /// Converts the error into the body's error, if it is one.
    #[inline]
    pub fn into_target(self) -> Option<E> {
        match self {
            Self::Target(err) => Some(err),
            Self::Recorder(_) => None,
        }
    }
}

impl<E: StdError + 'static> StdError for InvokeError<E> {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Recorder(err) => Some(err),
            Self::Target(err) => Some(err),
        }
    }
}

/// A test's target could not be recorded.
#[derive(Clone, Error)]
#[non_exhaustive]
pub struct InstrumentTestError {
    /// The test the target was recorded for.
    pub test: Test,
    /// The rendered target.
    pub target: String,
    /// Why the target can't be recorded.
    pub source: NonInstrumentableTypeError,
}

impl fmt::Display for InstrumentTestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to record {} for {}: {}",
            self.target, self.test, self.source
        )
    }
}

impl fmt::Debug for InstrumentTestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl InstrumentTestError {
    pub(crate) fn new(test: &Test, target: &Object, source: NonInstrumentableTypeError) -> Self {
        Self {
            test: test.clone(),
            target: target.to_string(),
            source,
        }
    }
}

/// A test's target could not be wrapped.
#[derive(Clone, Error)]
#[non_exhaustive]
pub struct WrapTestError {
    /// The test the target was wrapped for.
    pub test: Test,
    /// The rendered target.
    pub target: String,
    /// Why the target can't be wrapped.
    pub source: NotWrappableTypeError,
}

impl fmt::Display for WrapTestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to wrap {} for {}: {}",
            self.target, self.test, self.source
        )
    }
}

impl fmt::Debug for WrapTestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl WrapTestError {
    pub(crate) fn new(test: &Test, target: &Object, source: NotWrappableTypeError) -> Self {
        Self {
            test: test.clone(),
            target: target.to_string(),
            source,
        }
    }
}
