//! The script-facing side: registered tests recording their targets.

use std::sync::Arc;

use fxhash::FxHashMap;
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::{
    errors::{
        InstrumentTestError, NonInstrumentableTypeError, NotWrappableTypeError, WrapTestError,
    },
    filter::{InstrumentationFilter, ALL_INSTRUMENTATION},
    instrumenter::Instrumenter,
    object::Object,
    recorder::{Recorder, RecorderFactory},
    test_case::{Test, TestNumber},
};

/// Binds tests to recorders and instruments their targets.
pub struct TestRegistry {
    instrumenter: Arc<dyn Instrumenter>,
    factory: Arc<dyn RecorderFactory>,
    registered: Mutex<FxHashMap<TestNumber, RegisteredTest>>,
}

impl TestRegistry {
    /// Creates an empty registry.
    pub fn new(instrumenter: Arc<dyn Instrumenter>, factory: Arc<dyn RecorderFactory>) -> Self {
        Self {
            instrumenter,
            factory,
            registered: Mutex::default(),
        }
    }

    /// Registers `test`. Registering a test with the same number again
    /// returns the existing registration.
    pub fn register(&self, test: &Test) -> RegisteredTest {
        if let Some(registered) = self.registered.lock().get(&test.number()) {
            return registered.clone();
        }

        // The factory is called without the lock, it may use the registry.
        let recorder = self.factory.recorder_for(test);

        self.registered
            .lock()
            .entry(test.number())
            .or_insert_with(|| {
                debug!(test = %test, "test registered");
                RegisteredTest {
                    test: test.clone(),
                    recorder,
                    instrumenter: self.instrumenter.clone(),
                }
            })
            .clone()
    }

    /// Registered tests ordered by number.
    pub fn tests(&self) -> Vec<Test> {
        let mut tests = self
            .registered
            .lock()
            .values()
            .map(|r| r.test.clone())
            .collect::<Vec<_>>();
        tests.sort();
        tests
    }

    /// The instrumenter used by registered tests.
    pub fn instrumenter(&self) -> &Arc<dyn Instrumenter> {
        &self.instrumenter
    }
}

/// A test bound to its recorder.
#[derive(Clone)]
pub struct RegisteredTest {
    test: Test,
    recorder: Arc<dyn Recorder>,
    instrumenter: Arc<dyn Instrumenter>,
}

impl RegisteredTest {
    /// The registered test.
    #[inline]
    pub fn test(&self) -> &Test {
        &self.test
    }

    /// The recorder shared by every registration of the test.
    #[inline]
    pub fn recorder(&self) -> &Arc<dyn Recorder> {
        &self.recorder
    }

    /// Instruments every member of `target` in place.
    pub fn record(&self, target: &Object) -> Result<(), InstrumentTestError> {
        self.record_with(target, &ALL_INSTRUMENTATION)
    }

    /// Instruments members of `target` selected by `filter` in place.
    ///
    /// Fails if no instrumenter recorded anything.
    pub fn record_with(
        &self,
        target: &Object,
        filter: &dyn InstrumentationFilter,
    ) -> Result<(), InstrumentTestError> {
        self.instrumenter
            .instrument_with(&self.test, &self.recorder, target, filter)
            .and_then(|recorded| {
                if recorded {
                    Ok(())
                } else {
                    Err(NonInstrumentableTypeError::new(format!(
                        "no instrumenter recorded {target}"
                    )))
                }
            })
            .map_err(|err| {
                error!(test = %self.test, target = %target, error = %err, "cannot record");
                InstrumentTestError::new(&self.test, target, err)
            })
    }

    /// Returns the object scripts should use instead of `target`.
    pub fn wrap(&self, target: &Object) -> Result<Object, WrapTestError> {
        self.instrumenter
            .create_instrumented_proxy(&self.test, &self.recorder, target)
            .and_then(|wrapped| {
                wrapped.into_object().ok_or_else(|| {
                    NotWrappableTypeError::new(format!("no instrumenter can wrap {target}"))
                })
            })
            .map_err(|err| {
                error!(test = %self.test, target = %target, error = %err, "cannot wrap");
                WrapTestError::new(&self.test, target, err)
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        OnceLock, Weak,
    };

    use super::*;
    use crate::{
        errors::RecorderError,
        Class, CompositeInstrumenter, MasterInstrumenter, ObjectKind, Wrapped,
    };

    struct NoopRecorder;

    impl Recorder for NoopRecorder {
        fn start(&self) -> Result<(), RecorderError> {
            Ok(())
        }

        fn end(&self, _success: bool) -> Result<(), RecorderError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Factory(AtomicUsize);

    impl RecorderFactory for Factory {
        fn recorder_for(&self, _test: &Test) -> Arc<dyn Recorder> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Arc::new(NoopRecorder)
        }
    }

    /// Instruments instances in place, refuses class literals.
    struct InstancesOnly;

    impl Instrumenter for InstancesOnly {
        fn create_instrumented_proxy(
            &self,
            test: &Test,
            recorder: &Arc<dyn Recorder>,
            target: &Object,
        ) -> Result<Wrapped, NotWrappableTypeError> {
            if self.instrument(test, recorder, target)? {
                Ok(Wrapped::InPlace(target.clone()))
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
            match target.kind() {
                ObjectKind::Class(_) => {
                    Err(NonInstrumentableTypeError::new("class literal"))
                }
                _ => Ok(!target.is_null()),
            }
        }

        fn description(&self) -> Option<String> {
            None
        }
    }

    fn registry(instrumenter: Arc<dyn Instrumenter>) -> (TestRegistry, Arc<Factory>) {
        let factory = Arc::new(Factory::default());
        (TestRegistry::new(instrumenter, factory.clone()), factory)
    }

    #[test]
    fn same_number_same_recorder() {
        let (registry, factory) = registry(Arc::new(InstancesOnly));

        let first = registry.register(&Test::new(2, "b"));
        let again = registry.register(&Test::new(2, "other description"));
        registry.register(&Test::new(1, "a"));

        assert!(Arc::ptr_eq(first.recorder(), again.recorder()));
        assert_eq!(again.test().description(), "b");
        assert_eq!(factory.0.load(Ordering::SeqCst), 2);
        let numbers: Vec<u32> = registry.tests().iter().map(|t| t.number().into()).collect();
        assert_eq!(numbers, [1, 2]);
    }

    #[test]
    fn errors_name_the_test() {
        let (registry, _) = registry(Arc::new(InstancesOnly));
        let test = registry.register(&Test::new(5, "checkout"));
        let class = Class::builder("shop::Cart").build();

        let err = test.record(&Object::class_ref(&class)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to record class shop::Cart for Test 5 (checkout): non-instrumentable: class literal"
        );

        let err = test.wrap(&Object::class_ref(&class)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to wrap class shop::Cart for Test 5 (checkout): not wrappable: class literal"
        );
    }

    #[test]
    fn unsupported_is_an_error() {
        let composite = CompositeInstrumenter::new(vec![Arc::new(InstancesOnly) as _]);
        let (registry, _) = registry(Arc::new(composite));
        let test = registry.register(&Test::new(1, "t"));

        assert!(test.wrap(&Object::null()).is_err());
    }

    #[test]
    fn unrecorded_target_is_an_error() {
        let composite = CompositeInstrumenter::new(vec![Arc::new(InstancesOnly) as _]);
        let (registry, _) = registry(Arc::new(composite));
        let test = registry.register(&Test::new(1, "t"));

        let err = test.record(&Object::null()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to record null for Test 1 (t): non-instrumentable: no instrumenter recorded null"
        );

        let class = Class::builder("shop::Cart").build();
        test.record(&Object::instance(&class, ())).unwrap();
    }

    /// Looks into the registry while providing recorders.
    #[derive(Default)]
    struct Reentrant {
        registry: OnceLock<Weak<TestRegistry>>,
        seen: Mutex<Vec<usize>>,
    }

    impl RecorderFactory for Reentrant {
        fn recorder_for(&self, _test: &Test) -> Arc<dyn Recorder> {
            if let Some(registry) = self.registry.get().and_then(Weak::upgrade) {
                self.seen.lock().push(registry.tests().len());
            }
            Arc::new(NoopRecorder)
        }
    }

    #[test]
    fn factory_may_use_the_registry() {
        let factory = Arc::new(Reentrant::default());
        let registry = Arc::new(TestRegistry::new(Arc::new(InstancesOnly), factory.clone()));
        assert!(factory.registry.set(Arc::downgrade(&registry)).is_ok());

        registry.register(&Test::new(1, "a"));
        registry.register(&Test::new(2, "b"));
        registry.register(&Test::new(1, "a"));

        assert_eq!(*factory.seen.lock(), [0, 1]);
    }

    #[test]
    fn wrap_returns_the_target() {
        let master = MasterInstrumenter::new(vec![Arc::new(InstancesOnly) as _]);
        let (registry, _) = registry(Arc::new(master));
        let test = registry.register(&Test::new(1, "t"));
        let class = Class::builder("shop::Cart").build();
        let target = Object::instance(&class, ());

        assert!(test.wrap(&target).unwrap().ptr_eq(&target));
        test.record(&target).unwrap();
    }
}
