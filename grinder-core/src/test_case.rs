use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// The number identifying a [`Test`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    From,
    Into,
    Serialize,
    Deserialize,
)]
pub struct TestNumber(u32);

/// A named, user-declared unit of work to be measured.
///
/// Tests are created by script authors before the run starts and never
/// change afterwards. Two tests are equal iff their numbers are equal, the
/// description is informational only.
#[derive(Clone)]
pub struct Test {
    number: TestNumber,
    description: Arc<str>,
}

assert_impl_all!(Test: Send, Sync);

impl Test {
    /// Creates a test.
    pub fn new(number: u32, description: impl Into<Arc<str>>) -> Self {
        Self {
            number: TestNumber(number),
            description: description.into(),
        }
    }

    /// The number identifying the test.
    #[inline]
    pub fn number(&self) -> TestNumber {
        self.number
    }

    /// A human-readable description, informational only.
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl PartialEq for Test {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number
    }
}

impl Eq for Test {}

impl Hash for Test {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.number.hash(state);
    }
}

impl PartialOrd for Test {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Test {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number.cmp(&other.number)
    }
}

impl fmt::Debug for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Test")
            .field("number", &self.number.0)
            .field("description", &&*self.description)
            .finish()
    }
}

impl fmt::Display for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Test {} ({})", self.number, self.description)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn identity_ignores_description() {
        let a = Test::new(1, "login");
        let b = Test::new(1, "log in");
        let c = Test::new(2, "login");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a < c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn display() {
        assert_eq!(Test::new(7, "checkout").to_string(), "Test 7 (checkout)");
    }
}
