use std::sync::Arc;

use parking_lot::Mutex;

use grinder_core::{
    Class, DcrContext, Member, NonInstrumentableTypeError, Object, Recorder, TargetSource,
    WeavingError,
};

/// A call made to [`RecordingDcrContext`].
#[derive(Debug, Clone)]
pub enum DcrEvent {
    AddConstructor {
        class: Class,
        member: Member,
    },
    AddMethod {
        source: TargetSource,
        target: Object,
        member: Member,
    },
    AddMethodPair {
        first: (TargetSource, Object),
        second: (TargetSource, Object),
        member: Member,
    },
    ApplyChanges,
}

impl DcrEvent {
    /// Returns whether the event is a commit.
    pub fn is_apply(&self) -> bool {
        matches!(self, Self::ApplyChanges)
    }
}

/// A [`DcrContext`] that journals every call and changes nothing.
///
/// Classes can be denied with [`RecordingDcrContext::deny`], and commits can
/// be made to fail with [`RecordingDcrContext::fail_apply_with`].
#[derive(Default)]
pub struct RecordingDcrContext {
    events: Mutex<Vec<DcrEvent>>,
    denied: Mutex<Vec<String>>,
    apply_error: Mutex<Option<WeavingError>>,
}

impl RecordingDcrContext {
    /// Makes the class with the provided name non-instrumentable.
    pub fn deny(&self, class_name: &str) {
        self.denied.lock().push(class_name.into());
    }

    /// Makes every following `apply_changes` fail.
    pub fn fail_apply_with(&self, reason: &str) {
        *self.apply_error.lock() = Some(WeavingError::new(reason));
    }

    /// All calls so far, in order.
    pub fn events(&self) -> Vec<DcrEvent> {
        self.events.lock().clone()
    }

    /// The number of staging calls.
    pub fn staged_count(&self) -> usize {
        self.events.lock().iter().filter(|e| !e.is_apply()).count()
    }

    /// The number of commits.
    pub fn apply_count(&self) -> usize {
        self.events.lock().iter().filter(|e| e.is_apply()).count()
    }

    fn is_denied(&self, class_name: &str) -> bool {
        self.denied.lock().iter().any(|name| name == class_name)
    }

    fn check(&self, member: &Member) -> Result<(), NonInstrumentableTypeError> {
        if self.is_denied(member.declaring_class()) {
            return Err(NonInstrumentableTypeError::new(format!(
                "{} is denied",
                member.declaring_class()
            )));
        }
        Ok(())
    }
}

impl DcrContext for RecordingDcrContext {
    fn add_constructor(
        &self,
        target: &Class,
        constructor: &Member,
        _recorder: Arc<dyn Recorder>,
    ) -> Result<(), NonInstrumentableTypeError> {
        self.check(constructor)?;
        self.events.lock().push(DcrEvent::AddConstructor {
            class: target.clone(),
            member: constructor.clone(),
        });
        Ok(())
    }

    fn add_method(
        &self,
        source: TargetSource,
        target: &Object,
        method: &Member,
        _recorder: Arc<dyn Recorder>,
    ) -> Result<(), NonInstrumentableTypeError> {
        self.check(method)?;
        self.events.lock().push(DcrEvent::AddMethod {
            source,
            target: target.clone(),
            member: method.clone(),
        });
        Ok(())
    }

    fn add_method_with_targets(
        &self,
        first: (TargetSource, &Object),
        second: (TargetSource, &Object),
        method: &Member,
        _recorder: Arc<dyn Recorder>,
    ) -> Result<(), NonInstrumentableTypeError> {
        self.check(method)?;
        self.events.lock().push(DcrEvent::AddMethodPair {
            first: (first.0, first.1.clone()),
            second: (second.0, second.1.clone()),
            member: method.clone(),
        });
        Ok(())
    }

    fn is_instrumentable(&self, class: &Class) -> bool {
        !self.is_denied(class.name())
    }

    fn apply_changes(&self) -> Result<(), WeavingError> {
        self.events.lock().push(DcrEvent::ApplyChanges);

        match &*self.apply_error.lock() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}
