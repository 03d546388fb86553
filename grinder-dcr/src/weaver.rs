use std::{
    fmt, mem,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use arc_swap::ArcSwap;
use parking_lot::{Mutex, MutexGuard};
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use grinder_core::{
    bracket, Class, DcrContext, InvokeError, Member, NonInstrumentableTypeError, Object, Recorder,
    TargetSource, WeavingError,
};

use crate::{
    advice::{Advice, AdviceTable, Selector, Targets},
    config::WeaverConfig,
};

/// An in-process weaving engine.
///
/// Advices are staged by `add_*` calls and become visible to [`Weaver::invoke`]
/// only after [`DcrContext::apply_changes`], which publishes a new advice
/// table in a single step. Invocations never observe a half-applied batch.
///
/// The staging buffer is shared by all callers. A failed commit discards it
/// and bumps the generation, so callers using
/// [`DcrContext::apply_changes_since`] learn that their changes are lost.
pub struct Weaver {
    config: WeaverConfig,
    staged: Mutex<Vec<Advice>>,
    table: ArcSwap<AdviceTable>,
    sealed: AtomicBool,
    generation: AtomicU64,
}

impl Default for Weaver {
    fn default() -> Self {
        Self::new(WeaverConfig::default())
    }
}

impl Weaver {
    /// Creates a weaver without any advices.
    pub fn new(config: WeaverConfig) -> Self {
        Self {
            config,
            staged: Mutex::new(Vec::new()),
            table: ArcSwap::default(),
            sealed: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    /// Forbids further commits. Active advices stay active.
    pub fn seal(&self) {
        if !self.sealed.swap(true, Ordering::AcqRel) {
            info!(advices = self.advice_count(), "weaver is sealed");
        }
    }

    /// Returns whether [`Weaver::seal`] has been called.
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// The number of active advices.
    pub fn advice_count(&self) -> usize {
        self.table.load().len()
    }

    /// The number of staged, not yet applied advices.
    pub fn staged_count(&self) -> usize {
        self.staged.lock().len()
    }

    /// Runs `body` as an invocation of `member` with `args`, bracketed by the
    /// recorders of every active advice that matches the invocation.
    ///
    /// For instance methods `args[0]` is the receiver.
    pub fn invoke<R, E>(
        &self,
        member: &Member,
        args: &[Object],
        body: impl FnOnce() -> Result<R, E>,
    ) -> Result<R, InvokeError<E>>
    where
        E: fmt::Display,
    {
        if !self.table.load().contains_call_site(member) {
            return body().map_err(InvokeError::Target);
        }

        // Keep the table alive while the body runs, commits may replace it.
        let table = self.table.load_full();
        let recorders = table
            .recorders(member, args)
            .collect::<SmallVec<[&dyn Recorder; 4]>>();

        if recorders.is_empty() {
            return body().map_err(InvokeError::Target);
        }

        bracket(&recorders, body)
    }

    fn check_class(&self, class_name: &str) -> Result<(), NonInstrumentableTypeError> {
        if self.config.is_excluded(class_name) {
            return Err(NonInstrumentableTypeError::new(format!(
                "{class_name} is excluded from instrumentation"
            )));
        }
        Ok(())
    }

    fn check_method(
        &self,
        source: TargetSource,
        target: &Object,
        method: &Member,
    ) -> Result<(), NonInstrumentableTypeError> {
        if method.kind().is_constructor() {
            return Err(NonInstrumentableTypeError::new(format!(
                "{method} is a constructor"
            )));
        }

        self.check_class(method.declaring_class())?;

        if !source.can_apply_to(method) {
            return Err(NonInstrumentableTypeError::new(format!(
                "{source:?} can't be applied to {method}"
            )));
        }

        if source.parameter_index().is_some() && target.is_null() {
            return Err(NonInstrumentableTypeError::new(format!(
                "null target for {method}"
            )));
        }

        Ok(())
    }

    fn stage(&self, advice: Advice) {
        debug!(member = %advice.member, "advice is staged");
        self.staged.lock().push(advice);
    }
}

impl DcrContext for Weaver {
    fn add_constructor(
        &self,
        target: &Class,
        constructor: &Member,
        recorder: Arc<dyn Recorder>,
    ) -> Result<(), NonInstrumentableTypeError> {
        if !constructor.kind().is_constructor() {
            return Err(NonInstrumentableTypeError::new(format!(
                "{constructor} is not a constructor"
            )));
        }

        if constructor.declaring_class() != target.name() {
            return Err(NonInstrumentableTypeError::new(format!(
                "{constructor} doesn't construct {target}"
            )));
        }

        self.check_class(target.name())?;

        self.stage(Advice {
            member: constructor.clone(),
            targets: Targets::Any,
            recorder,
        });
        Ok(())
    }

    fn add_method(
        &self,
        source: TargetSource,
        target: &Object,
        method: &Member,
        recorder: Arc<dyn Recorder>,
    ) -> Result<(), NonInstrumentableTypeError> {
        self.check_method(source, target, method)?;

        let targets = if source.is_class() {
            Targets::Any
        } else {
            Targets::One(Selector::new(source, target))
        };

        self.stage(Advice {
            member: method.clone(),
            targets,
            recorder,
        });
        Ok(())
    }

    fn add_method_with_targets(
        &self,
        (first_source, first): (TargetSource, &Object),
        (second_source, second): (TargetSource, &Object),
        method: &Member,
        recorder: Arc<dyn Recorder>,
    ) -> Result<(), NonInstrumentableTypeError> {
        if first_source == second_source
            || first_source.is_class()
            || second_source.is_class()
        {
            return Err(NonInstrumentableTypeError::new(format!(
                "{first_source:?} and {second_source:?} must be distinct parameters"
            )));
        }

        self.check_method(first_source, first, method)?;
        self.check_method(second_source, second, method)?;

        self.stage(Advice {
            member: method.clone(),
            targets: Targets::Two(
                Selector::new(first_source, first),
                Selector::new(second_source, second),
            ),
            recorder,
        });
        Ok(())
    }

    fn is_instrumentable(&self, class: &Class) -> bool {
        !self.config.is_excluded(class.name())
    }

    fn apply_changes(&self) -> Result<(), WeavingError> {
        self.commit(self.staged.lock())
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn apply_changes_since(&self, generation: u64) -> Result<(), WeavingError> {
        let staged = self.staged.lock();

        if self.generation() != generation {
            warn!(
                since = generation,
                now = self.generation(),
                "staged changes were discarded by a failed commit"
            );
            return Err(WeavingError::new(
                "staged changes were discarded by a failed commit",
            ));
        }

        self.commit(staged)
    }
}

impl Weaver {
    // All structural updates must be performed under the staging lock.
    fn commit(&self, mut staged: MutexGuard<'_, Vec<Advice>>) -> Result<(), WeavingError> {
        let batch = mem::take(&mut *staged);

        if self.is_sealed() {
            warn!(discarded = batch.len(), "cannot apply changes to a sealed weaver");
            if !batch.is_empty() {
                self.generation.fetch_add(1, Ordering::AcqRel);
            }
            return Err(WeavingError::new("weaver is sealed"));
        }

        if batch.is_empty() {
            return Ok(());
        }

        let staged_count = batch.len();
        let mut table = AdviceTable::clone(&self.table.load());

        match table.extend(batch, self.config.max_advices_per_call_site) {
            Ok(added) => {
                self.table.store(Arc::new(table));
                debug!(staged = staged_count, added, "changes are applied");
                Ok(())
            }
            Err(err) => {
                warn!(discarded = staged_count, error = %err, "cannot apply changes");
                self.generation.fetch_add(1, Ordering::AcqRel);
                Err(err)
            }
        }
    }
}
