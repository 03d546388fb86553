use std::sync::Arc;

use tracing::trace;

use grinder_core::{
    Class, ClassKind, DcrContext, InstrumentationFilter, NonInstrumentableTypeError, Object,
    ObjectKind, Recorder, Stager, TargetSource,
};

/// Stages host classes and their instances.
///
/// A class literal stands for its constructors and static methods, an
/// instance for the instance methods of its class and every instrumentable
/// ancestor.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostStager;

impl Stager for HostStager {
    fn stage(
        &self,
        context: &dyn DcrContext,
        target: &Object,
        recorder: &Arc<dyn Recorder>,
        filter: &dyn InstrumentationFilter,
    ) -> Result<bool, NonInstrumentableTypeError> {
        let (class, is_literal) = match target.kind() {
            ObjectKind::Class(class) => (class, true),
            ObjectKind::Instance(class) => (class, false),
            ObjectKind::Null | ObjectKind::BoundMethod { .. } => return Ok(false),
        };

        if class.kind() != ClassKind::Host {
            return Ok(false);
        }

        if !context.is_instrumentable(class) {
            return Err(NonInstrumentableTypeError::new(format!(
                "{class} is not instrumentable"
            )));
        }

        if is_literal {
            stage_class(context, class, target, recorder, filter)
        } else {
            stage_instance(context, class, target, recorder, filter)
        }
    }

    fn description(&self) -> Option<String> {
        Some("host DCR instrumenter".into())
    }
}

fn stage_class(
    context: &dyn DcrContext,
    class: &Class,
    literal: &Object,
    recorder: &Arc<dyn Recorder>,
    filter: &dyn InstrumentationFilter,
) -> Result<bool, NonInstrumentableTypeError> {
    let mut staged = false;

    for constructor in class.constructors().filter(|m| filter.matches(m)) {
        context.add_constructor(class, constructor, recorder.clone())?;
        staged = true;
    }

    for method in class.static_methods().filter(|m| filter.matches(m)) {
        context.add_method(TargetSource::Class, literal, method, recorder.clone())?;
        staged = true;
    }

    Ok(staged)
}

fn stage_instance(
    context: &dyn DcrContext,
    class: &Class,
    target: &Object,
    recorder: &Arc<dyn Recorder>,
    filter: &dyn InstrumentationFilter,
) -> Result<bool, NonInstrumentableTypeError> {
    let mut staged = false;

    for ancestor in class.hierarchy() {
        if !context.is_instrumentable(ancestor) {
            trace!(class = %ancestor, "ancestor is skipped");
            continue;
        }

        for method in ancestor.methods().filter(|m| filter.matches(m)) {
            context.add_method(
                TargetSource::FirstParameter,
                target,
                method,
                recorder.clone(),
            )?;
            staged = true;
        }
    }

    Ok(staged)
}
