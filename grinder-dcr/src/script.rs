use std::sync::Arc;

use grinder_core::{
    Class, ClassKind, DcrContext, InstrumentationFilter, NonInstrumentableTypeError, Object,
    ObjectKind, Recorder, Stager, TargetSource,
};

/// The name of the member script engines dispatch calls through.
pub const CALL_METHOD: &str = "__call__";

/// Stages objects of a script engine: functions, bound methods, script
/// classes and their instances.
///
/// Calls of a bound method are dispatched through the function's
/// [`CALL_METHOD`] with the function as the first argument and the receiver
/// as the second one.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptStager;

impl Stager for ScriptStager {
    fn stage(
        &self,
        context: &dyn DcrContext,
        target: &Object,
        recorder: &Arc<dyn Recorder>,
        filter: &dyn InstrumentationFilter,
    ) -> Result<bool, NonInstrumentableTypeError> {
        if target.class_kind() != Some(ClassKind::Script) {
            return Ok(false);
        }

        match target.kind() {
            ObjectKind::BoundMethod { function, receiver } => {
                stage_bound(context, function, receiver, recorder, filter)
            }
            ObjectKind::Instance(class) => stage_instance(context, class, target, recorder, filter),
            ObjectKind::Class(class) => {
                check(context, class)?;

                let mut staged = false;
                for constructor in class.constructors().filter(|m| filter.matches(m)) {
                    context.add_constructor(class, constructor, recorder.clone())?;
                    staged = true;
                }
                Ok(staged)
            }
            ObjectKind::Null => Ok(false),
        }
    }

    fn description(&self) -> Option<String> {
        Some("script DCR instrumenter".into())
    }
}

fn check(context: &dyn DcrContext, class: &Class) -> Result<(), NonInstrumentableTypeError> {
    if context.is_instrumentable(class) {
        Ok(())
    } else {
        Err(NonInstrumentableTypeError::new(format!(
            "{class} is not instrumentable"
        )))
    }
}

fn stage_bound(
    context: &dyn DcrContext,
    function: &Object,
    receiver: &Object,
    recorder: &Arc<dyn Recorder>,
    filter: &dyn InstrumentationFilter,
) -> Result<bool, NonInstrumentableTypeError> {
    let Some(class) = function.class() else {
        return Ok(false);
    };

    check(context, class)?;

    let call = match class.find_method(CALL_METHOD) {
        Some(call) if filter.matches(call) => call,
        Some(_) => return Ok(false),
        None => {
            return Err(NonInstrumentableTypeError::new(format!(
                "{class} has no {CALL_METHOD}"
            )))
        }
    };

    context.add_method_with_targets(
        (TargetSource::FirstParameter, function),
        (TargetSource::SecondParameter, receiver),
        call,
        recorder.clone(),
    )?;

    Ok(true)
}

fn stage_instance(
    context: &dyn DcrContext,
    class: &Class,
    target: &Object,
    recorder: &Arc<dyn Recorder>,
    filter: &dyn InstrumentationFilter,
) -> Result<bool, NonInstrumentableTypeError> {
    check(context, class)?;

    // Callables are measured as a whole.
    if let Some(call) = class.find_method(CALL_METHOD) {
        if !filter.matches(call) {
            return Ok(false);
        }

        context.add_method(TargetSource::FirstParameter, target, call, recorder.clone())?;
        return Ok(true);
    }

    let mut staged = false;
    for method in class.methods().filter(|m| filter.matches(m)) {
        context.add_method(
            TargetSource::FirstParameter,
            target,
            method,
            recorder.clone(),
        )?;
        staged = true;
    }

    Ok(staged)
}

#[cfg(test)]
mod tests {
    use grinder_core::Member;
    use grinder_test::{CountingRecorder, DcrEvent, RecordingDcrContext};

    use super::*;

    fn function_class() -> Class {
        Class::builder("script::Function")
            .kind(ClassKind::Script)
            .method(CALL_METHOD, 3)
            .build()
    }

    fn stage(
        context: &RecordingDcrContext,
        target: &Object,
        filter: &dyn InstrumentationFilter,
    ) -> Result<bool, NonInstrumentableTypeError> {
        let recorder: Arc<dyn Recorder> = Arc::new(CountingRecorder::default());
        ScriptStager.stage(context, target, &recorder, filter)
    }

    fn all(_: &Member) -> bool {
        true
    }

    #[test]
    fn bound_method_stages_call_with_both_targets() {
        let class = function_class();
        let function = Object::instance(&class, ());
        let receiver = Object::instance(&class, ());
        let bound = Object::bind(&function, &receiver).unwrap();
        let context = RecordingDcrContext::default();

        assert!(stage(&context, &bound, &all).unwrap());

        match &context.events()[..] {
            [DcrEvent::AddMethodPair {
                first,
                second,
                member,
            }] => {
                assert_eq!(first.0, TargetSource::FirstParameter);
                assert!(first.1.ptr_eq(&function));
                assert_eq!(second.0, TargetSource::SecondParameter);
                assert!(second.1.ptr_eq(&receiver));
                assert_eq!(member.name(), CALL_METHOD);
            }
            events => panic!("unexpected events: {events:?}"),
        }
    }

    #[test]
    fn callable_stages_call_only() {
        let class = Class::builder("script::Greeter")
            .kind(ClassKind::Script)
            .method(CALL_METHOD, 2)
            .method("greet", 2)
            .build();
        let target = Object::instance(&class, ());
        let context = RecordingDcrContext::default();

        assert!(stage(&context, &target, &all).unwrap());

        match &context.events()[..] {
            [DcrEvent::AddMethod {
                source,
                target: staged,
                member,
            }] => {
                assert_eq!(*source, TargetSource::FirstParameter);
                assert!(staged.ptr_eq(&target));
                assert_eq!(member.name(), CALL_METHOD);
            }
            events => panic!("unexpected events: {events:?}"),
        }
    }

    #[test]
    fn plain_instance_stages_filtered_methods() {
        let class = Class::builder("script::Basket")
            .kind(ClassKind::Script)
            .method("add", 2)
            .method("total", 1)
            .build();
        let context = RecordingDcrContext::default();
        let only_total = |m: &Member| m.name() == "total";

        assert!(stage(&context, &Object::instance(&class, ()), &only_total).unwrap());
        assert_eq!(context.events().len(), 1);
    }

    #[test]
    fn class_literal_stages_constructors() {
        let class = Class::builder("script::Basket")
            .kind(ClassKind::Script)
            .constructor(1)
            .method("add", 2)
            .build();
        let context = RecordingDcrContext::default();

        assert!(stage(&context, &Object::class_ref(&class), &all).unwrap());
        assert!(matches!(
            &context.events()[..],
            [DcrEvent::AddConstructor { .. }]
        ));
    }

    #[test]
    fn host_targets_are_declined() {
        let host = Class::builder("bank::Account").method("deposit", 2).build();
        let context = RecordingDcrContext::default();

        assert!(!stage(&context, &Object::instance(&host, ()), &all).unwrap());
        assert!(!stage(&context, &Object::class_ref(&host), &all).unwrap());
        assert!(!stage(&context, &Object::null(), &all).unwrap());
        assert!(context.events().is_empty());
    }

    #[test]
    fn denied_script_class_is_an_error() {
        let class = function_class();
        let context = RecordingDcrContext::default();
        context.deny("script::Function");

        assert!(stage(&context, &Object::instance(&class, ()), &all).is_err());
    }
}
