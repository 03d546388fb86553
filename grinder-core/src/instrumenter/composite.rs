use std::sync::Arc;

use crate::{
    errors::{NonInstrumentableTypeError, NotWrappableTypeError},
    filter::InstrumentationFilter,
    object::Object,
    recorder::Recorder,
    test_case::Test,
};

use super::{Instrumenter, Wrapped};

/// An ordered chain of instrumenters, the first one that applies wins.
///
/// Order is priority and is fixed at construction. The composite doesn't
/// claim to know every instrumentable type: if no child applies, it returns
/// [`Wrapped::Unsupported`] or `false` rather than an error. Errors raised by
/// children abort the scan and are propagated unchanged.
#[derive(Clone, Default)]
pub struct CompositeInstrumenter {
    instrumenters: Vec<Arc<dyn Instrumenter>>,
}

impl CompositeInstrumenter {
    /// Creates a chain, `instrumenters` are ordered by priority.
    pub fn new(instrumenters: Vec<Arc<dyn Instrumenter>>) -> Self {
        Self { instrumenters }
    }

    /// The chained instrumenters in priority order.
    pub fn instrumenters(&self) -> &[Arc<dyn Instrumenter>] {
        &self.instrumenters
    }
}

impl FromIterator<Arc<dyn Instrumenter>> for CompositeInstrumenter {
    fn from_iter<T: IntoIterator<Item = Arc<dyn Instrumenter>>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Instrumenter for CompositeInstrumenter {
    fn create_instrumented_proxy(
        &self,
        test: &Test,
        recorder: &Arc<dyn Recorder>,
        target: &Object,
    ) -> Result<Wrapped, NotWrappableTypeError> {
        for instrumenter in &self.instrumenters {
            match instrumenter.create_instrumented_proxy(test, recorder, target)? {
                Wrapped::Unsupported => continue,
                wrapped => return Ok(wrapped),
            }
        }

        Ok(Wrapped::Unsupported)
    }

    fn instrument_with(
        &self,
        test: &Test,
        recorder: &Arc<dyn Recorder>,
        target: &Object,
        filter: &dyn InstrumentationFilter,
    ) -> Result<bool, NonInstrumentableTypeError> {
        for instrumenter in &self.instrumenters {
            if instrumenter.instrument_with(test, recorder, target, filter)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn description(&self) -> Option<String> {
        let descriptions = self
            .instrumenters
            .iter()
            .filter_map(|i| i.description())
            .collect::<Vec<_>>();

        if descriptions.is_empty() {
            None
        } else {
            Some(descriptions.join("; "))
        }
    }
}
