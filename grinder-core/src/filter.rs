use crate::class::Member;

/// Selects which members of a target are instrumented.
///
/// Implemented for any `Fn(&Member) -> bool`.
pub trait InstrumentationFilter: Send + Sync {
    /// Returns whether `member` should be instrumented.
    fn matches(&self, member: &Member) -> bool;
}

impl<F> InstrumentationFilter for F
where
    F: Fn(&Member) -> bool + Send + Sync,
{
    #[inline]
    fn matches(&self, member: &Member) -> bool {
        self(member)
    }
}

/// Matches every member. See [`ALL_INSTRUMENTATION`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AllInstrumentation;

impl InstrumentationFilter for AllInstrumentation {
    #[inline]
    fn matches(&self, _member: &Member) -> bool {
        true
    }
}

/// The default filter, matching every member.
pub const ALL_INSTRUMENTATION: AllInstrumentation = AllInstrumentation;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Class;

    #[test]
    fn closures_are_filters() {
        let class = Class::builder("a::B")
            .method("get", 1)
            .method("put", 2)
            .build();
        let only_get = |member: &Member| member.name() == "get";

        let matched: Vec<_> = class
            .members()
            .iter()
            .filter(|m| only_get.matches(m))
            .map(Member::name)
            .collect();
        assert_eq!(matched, ["get"]);

        assert!(class.members().iter().all(|m| ALL_INSTRUMENTATION.matches(m)));
    }
}
