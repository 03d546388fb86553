use std::sync::Arc;

use crate::{
    errors::{NonInstrumentableTypeError, NotWrappableTypeError},
    filter::InstrumentationFilter,
    object::Object,
    recorder::Recorder,
    test_case::Test,
};

use super::{CompositeInstrumenter, Instrumenter, Wrapped};

/// Rejects null targets, passes on everything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectNullInstrumenter;

impl Instrumenter for RejectNullInstrumenter {
    fn create_instrumented_proxy(
        &self,
        _test: &Test,
        _recorder: &Arc<dyn Recorder>,
        target: &Object,
    ) -> Result<Wrapped, NotWrappableTypeError> {
        if target.is_null() {
            return Err(NotWrappableTypeError::new("can't wrap null"));
        }

        Ok(Wrapped::Unsupported)
    }

    fn instrument_with(
        &self,
        _test: &Test,
        _recorder: &Arc<dyn Recorder>,
        target: &Object,
        _filter: &dyn InstrumentationFilter,
    ) -> Result<bool, NonInstrumentableTypeError> {
        if target.is_null() {
            return Err(NonInstrumentableTypeError::new("can't instrument null"));
        }

        Ok(false)
    }

    fn description(&self) -> Option<String> {
        None
    }
}

/// The instrumenter handed to scripts.
///
/// Unlike [`CompositeInstrumenter`], it's expected to recognise every legal
/// target, so a target that no child handles is an error.
pub struct MasterInstrumenter {
    inner: CompositeInstrumenter,
    children: CompositeInstrumenter,
}

impl MasterInstrumenter {
    /// `instrumenters` are tried in order after null targets are rejected.
    pub fn new(instrumenters: Vec<Arc<dyn Instrumenter>>) -> Self {
        let children = CompositeInstrumenter::new(instrumenters);
        let inner = CompositeInstrumenter::new(vec![
            Arc::new(RejectNullInstrumenter) as Arc<dyn Instrumenter>,
            Arc::new(children.clone()),
        ]);

        Self { inner, children }
    }

    /// The instrumenters provided at construction.
    pub fn instrumenters(&self) -> &[Arc<dyn Instrumenter>] {
        self.children.instrumenters()
    }
}

impl Instrumenter for MasterInstrumenter {
    fn create_instrumented_proxy(
        &self,
        test: &Test,
        recorder: &Arc<dyn Recorder>,
        target: &Object,
    ) -> Result<Wrapped, NotWrappableTypeError> {
        match self.inner.create_instrumented_proxy(test, recorder, target)? {
            Wrapped::Unsupported => Err(NotWrappableTypeError::new(format!(
                "failed to wrap {target}"
            ))),
            wrapped => Ok(wrapped),
        }
    }

    fn instrument_with(
        &self,
        test: &Test,
        recorder: &Arc<dyn Recorder>,
        target: &Object,
        filter: &dyn InstrumentationFilter,
    ) -> Result<bool, NonInstrumentableTypeError> {
        if !self.inner.instrument_with(test, recorder, target, filter)? {
            return Err(NonInstrumentableTypeError::new(format!(
                "failed to instrument {target}"
            )));
        }

        Ok(true)
    }

    fn description(&self) -> Option<String> {
        self.inner.description()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Class, RecorderError};

    struct NoopRecorder;

    impl Recorder for NoopRecorder {
        fn start(&self) -> Result<(), RecorderError> {
            Ok(())
        }

        fn end(&self, _success: bool) -> Result<(), RecorderError> {
            Ok(())
        }
    }

    /// Claims targets of one class only.
    struct ClassOnly(Class);

    impl Instrumenter for ClassOnly {
        fn create_instrumented_proxy(
            &self,
            _test: &Test,
            _recorder: &Arc<dyn Recorder>,
            target: &Object,
        ) -> Result<Wrapped, NotWrappableTypeError> {
            if target.class() == Some(&self.0) {
                Ok(Wrapped::Proxied(Object::instance(&self.0, "proxy")))
            } else {
                Ok(Wrapped::Unsupported)
            }
        }

        fn instrument_with(
            &self,
            _test: &Test,
            _recorder: &Arc<dyn Recorder>,
            target: &Object,
            _filter: &dyn InstrumentationFilter,
        ) -> Result<bool, NonInstrumentableTypeError> {
            Ok(target.class() == Some(&self.0))
        }

        fn description(&self) -> Option<String> {
            Some(format!("only {}", self.0))
        }
    }

    fn setup() -> (MasterInstrumenter, Class, Test, Arc<dyn Recorder>) {
        let class = Class::builder("a::Known").build();
        let master = MasterInstrumenter::new(vec![Arc::new(ClassOnly(class.clone())) as _]);
        (master, class, Test::new(3, "t"), Arc::new(NoopRecorder))
    }

    #[test]
    fn null_is_rejected() {
        let (master, _, test, recorder) = setup();

        let err = master
            .create_instrumented_proxy(&test, &recorder, &Object::null())
            .unwrap_err();
        assert_eq!(err.reason, "can't wrap null");

        let err = master
            .instrument(&test, &recorder, &Object::null())
            .unwrap_err();
        assert_eq!(err.reason, "can't instrument null");
    }

    #[test]
    fn unknown_targets_are_errors() {
        let (master, _, test, recorder) = setup();
        let other = Class::builder("a::Unknown").build();
        let target = Object::class_ref(&other);

        let err = master
            .create_instrumented_proxy(&test, &recorder, &target)
            .unwrap_err();
        assert_eq!(err.reason, "failed to wrap class a::Unknown");

        let err = master.instrument(&test, &recorder, &target).unwrap_err();
        assert_eq!(err.reason, "failed to instrument class a::Unknown");
    }

    #[test]
    fn known_targets_are_delegated() {
        let (master, class, test, recorder) = setup();
        let target = Object::instance(&class, ());

        let wrapped = master
            .create_instrumented_proxy(&test, &recorder, &target)
            .unwrap();
        let proxy = match wrapped {
            Wrapped::Proxied(proxy) => proxy,
            wrapped => panic!("unexpected: {wrapped:?}"),
        };
        assert!(!proxy.ptr_eq(&target));
        assert_eq!(proxy.downcast_ref::<&str>(), Some(&"proxy"));

        assert!(master.instrument(&test, &recorder, &target).unwrap());
        assert_eq!(master.description().as_deref(), Some("only a::Known"));
        assert_eq!(master.instrumenters().len(), 1);
    }
}
