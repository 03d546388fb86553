use std::{sync::Arc, time::Duration};

use fxhash::FxHashMap;
use parking_lot::Mutex;
use tracing::debug;

use grinder_core::{Recorder, RecorderFactory, Test, TestNumber};

use crate::recorder::TestRecorder;

/// Totals of a test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestSummary {
    /// Executions completed without an error.
    pub successes: u64,
    /// Executions completed with an error.
    pub errors: u64,
    /// Time spent in successful and failed executions.
    pub total_time: Duration,
}

impl TestSummary {
    /// All completed executions.
    pub fn executions(&self) -> u64 {
        self.successes + self.errors
    }

    /// The mean execution time, `None` if nothing was executed.
    pub fn mean_time(&self) -> Option<Duration> {
        let executions = u32::try_from(self.executions()).ok()?;
        self.total_time.checked_div(executions)
    }
}

/// Statistics of all tests of a worker.
#[derive(Default)]
pub struct Statistics {
    recorders: Mutex<FxHashMap<TestNumber, Arc<TestRecorder>>>,
}

impl Statistics {
    /// Creates empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorder of `test`, created on first use.
    pub fn recorder(&self, test: &Test) -> Arc<TestRecorder> {
        self.recorders
            .lock()
            .entry(test.number())
            .or_insert_with(|| {
                debug!(test = %test, "new test recorder");
                Arc::new(TestRecorder::new(test.clone()))
            })
            .clone()
    }

    /// Summaries of all known tests, ordered by test number.
    pub fn snapshot(&self) -> Vec<(Test, TestSummary)> {
        let mut summaries = self
            .recorders
            .lock()
            .values()
            .map(|r| (r.test().clone(), r.summary()))
            .collect::<Vec<_>>();

        summaries.sort_by(|(a, _), (b, _)| a.cmp(b));
        summaries
    }
}

impl RecorderFactory for Statistics {
    fn recorder_for(&self, test: &Test) -> Arc<dyn Recorder> {
        self.recorder(test)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn one_recorder_per_test() {
        let statistics = Statistics::new();
        let first = statistics.recorder_for(&Test::new(1, "login"));
        let again = statistics.recorder_for(&Test::new(1, "login again"));
        let other = statistics.recorder_for(&Test::new(2, "logout"));

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[test]
    fn snapshot_is_ordered() {
        let statistics = Statistics::new();

        for number in [3, 1, 2] {
            let recorder = statistics.recorder_for(&Test::new(number, "t"));
            recorder.start().unwrap();
            recorder.end(number != 2).unwrap();
        }

        let snapshot = statistics.snapshot();
        let numbers = snapshot
            .iter()
            .map(|(test, _)| u32::from(test.number()))
            .collect::<Vec<_>>();
        assert_eq!(numbers, [1, 2, 3]);
        assert_eq!(snapshot[1].1.errors, 1);
        assert_eq!(snapshot[2].1.successes, 1);
    }

    #[test]
    fn mean_time() {
        let summary = TestSummary {
            successes: 3,
            errors: 1,
            total_time: Duration::from_millis(100),
        };
        assert_eq!(summary.mean_time(), Some(Duration::from_millis(25)));
        assert_eq!(TestSummary::default().mean_time(), None);
    }

    proptest! {
        #[test]
        fn every_outermost_end_is_counted(outcomes in prop::collection::vec(any::<bool>(), 0..32)) {
            let statistics = Statistics::new();
            let recorder = statistics.recorder_for(&Test::new(1, "t"));

            for success in &outcomes {
                recorder.start().unwrap();
                recorder.end(*success).unwrap();
            }

            let (_, summary) = statistics.snapshot().pop().unwrap();
            let successes = outcomes.iter().filter(|s| **s).count() as u64;
            prop_assert_eq!(summary.successes, successes);
            prop_assert_eq!(summary.executions(), outcomes.len() as u64);
        }
    }
}
