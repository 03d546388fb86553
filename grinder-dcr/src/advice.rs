use std::sync::Arc;

use fxhash::FxHashMap;
use smallvec::SmallVec;

use grinder_core::{Member, MemberId, Object, Recorder, TargetSource, WeavingError};

/// A recorder attached to a member for some targets.
#[derive(Clone)]
pub(crate) struct Advice {
    pub(crate) member: Member,
    pub(crate) targets: Targets,
    pub(crate) recorder: Arc<dyn Recorder>,
}

/// Which invocations of the member an advice applies to.
#[derive(Clone)]
pub(crate) enum Targets {
    /// Every invocation, used for constructors and static members.
    Any,
    One(Selector),
    Two(Selector, Selector),
}

#[derive(Clone)]
pub(crate) struct Selector {
    pub(crate) source: TargetSource,
    pub(crate) target: Object,
}

impl Selector {
    pub(crate) fn new(source: TargetSource, target: &Object) -> Self {
        Self {
            source,
            target: target.clone(),
        }
    }

    fn matches(&self, args: &[Object]) -> bool {
        match self.source.parameter_index() {
            None => true,
            Some(index) => args
                .get(index)
                .map_or(false, |arg| arg.ptr_eq(&self.target)),
        }
    }

    fn same_as(&self, other: &Selector) -> bool {
        self.source == other.source && self.target.ptr_eq(&other.target)
    }
}

impl Targets {
    fn matches(&self, args: &[Object]) -> bool {
        match self {
            Self::Any => true,
            Self::One(selector) => selector.matches(args),
            Self::Two(first, second) => first.matches(args) && second.matches(args),
        }
    }

    fn same_as(&self, other: &Targets) -> bool {
        match (self, other) {
            (Self::Any, Self::Any) => true,
            (Self::One(a), Self::One(b)) => a.same_as(b),
            (Self::Two(a1, a2), Self::Two(b1, b2)) => a1.same_as(b1) && a2.same_as(b2),
            _ => false,
        }
    }
}

impl Advice {
    fn same_as(&self, other: &Advice) -> bool {
        self.member == other.member
            && same_recorder(&self.recorder, &other.recorder)
            && self.targets.same_as(&other.targets)
    }
}

fn same_recorder(a: &Arc<dyn Recorder>, b: &Arc<dyn Recorder>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Active advices keyed by member. Immutable once published.
#[derive(Clone, Default)]
pub(crate) struct AdviceTable {
    call_sites: FxHashMap<MemberId, SmallVec<[Advice; 2]>>,
    len: usize,
}

impl AdviceTable {
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn contains_call_site(&self, member: &Member) -> bool {
        self.call_sites.contains_key(&member.id())
    }

    /// Adds a batch of advices, skipping ones that are already present.
    /// Returns the number of added advices.
    ///
    /// On error the table is left partially updated and must be discarded.
    pub(crate) fn extend(
        &mut self,
        batch: Vec<Advice>,
        max_per_call_site: usize,
    ) -> Result<usize, WeavingError> {
        let mut added = 0;

        for advice in batch {
            let call_site = self.call_sites.entry(advice.member.id()).or_default();

            if call_site.iter().any(|a| a.same_as(&advice)) {
                continue;
            }

            if call_site.len() >= max_per_call_site {
                return Err(WeavingError::new(format!(
                    "too many advices for {}, the limit is {max_per_call_site}",
                    advice.member
                )));
            }

            call_site.push(advice);
            added += 1;
        }

        self.len += added;
        Ok(added)
    }

    /// Recorders of advices applicable to the invocation, in registration
    /// order.
    pub(crate) fn recorders<'a>(
        &'a self,
        member: &Member,
        args: &'a [Object],
    ) -> impl Iterator<Item = &'a dyn Recorder> + 'a {
        self.call_sites
            .get(&member.id())
            .into_iter()
            .flatten()
            .filter(move |advice| advice.targets.matches(args))
            .map(|advice| &*advice.recorder)
    }
}
