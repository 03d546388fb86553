use std::{
    cell::Cell,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use metrics::{Key, Label};
use quanta::Instant;
use thread_local::ThreadLocal;
use tracing::trace;

use grinder_core::{Recorder, RecorderError, Test};

use crate::statistics::TestSummary;

/// Records executions of one test.
///
/// Brackets may nest on a thread (an instrumented method calling another
/// method of the same target), only the outermost one is measured.
pub struct TestRecorder {
    test: Test,
    nesting: ThreadLocal<Nesting>,
    successes: AtomicU64,
    errors: AtomicU64,
    total_time_ns: AtomicU64,
    keys: Keys,
}

#[derive(Default)]
struct Nesting {
    depth: Cell<u32>,
    start_time: Cell<Option<Instant>>,
}

struct Keys {
    time: Key,
    total: Key,
    errors: Key,
}

impl Keys {
    fn new(test: &Test) -> Self {
        let key = |name: &'static str| {
            Key::from_parts(name, vec![Label::new("test", test.number().to_string())])
        };

        Self {
            time: key("grinder_test_time_seconds"),
            total: key("grinder_tests_total"),
            errors: key("grinder_test_errors_total"),
        }
    }
}

impl TestRecorder {
    /// Creates a recorder measuring `test`.
    pub fn new(test: Test) -> Self {
        Self {
            keys: Keys::new(&test),
            test,
            nesting: ThreadLocal::new(),
            successes: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            total_time_ns: AtomicU64::new(0),
        }
    }

    /// The measured test.
    pub fn test(&self) -> &Test {
        &self.test
    }

    /// Totals of completed executions so far.
    pub fn summary(&self) -> TestSummary {
        TestSummary {
            successes: self.successes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            total_time: Duration::from_nanos(self.total_time_ns.load(Ordering::Relaxed)),
        }
    }

    fn complete(&self, elapsed: Duration, success: bool) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.total_time_ns.fetch_add(nanos, Ordering::Relaxed);

        if success {
            self.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }

        if let Some(recorder) = metrics::try_recorder() {
            recorder.record_histogram(&self.keys.time, elapsed.as_secs_f64());
            recorder.increment_counter(&self.keys.total, 1);
            if !success {
                recorder.increment_counter(&self.keys.errors, 1);
            }
        }

        trace!(test = %self.test, ?elapsed, success, "execution recorded");
    }
}

impl Recorder for TestRecorder {
    fn start(&self) -> Result<(), RecorderError> {
        let nesting = self.nesting.get_or_default();
        let depth = nesting.depth.get();

        if depth == 0 {
            nesting.start_time.set(Some(Instant::now()));
        }

        nesting.depth.set(depth + 1);
        Ok(())
    }

    fn end(&self, success: bool) -> Result<(), RecorderError> {
        let nesting = self.nesting.get_or_default();
        let depth = nesting.depth.get();

        if depth == 0 {
            return Err(RecorderError::new(format!(
                "{} isn't started on this thread",
                self.test
            )));
        }

        nesting.depth.set(depth - 1);
        if depth > 1 {
            return Ok(());
        }

        let start_time = nesting.start_time.take().ok_or_else(|| {
            RecorderError::new(format!("{} has no start time", self.test))
        })?;

        self.complete(Instant::now().duration_since(start_time), success);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    fn recorder() -> TestRecorder {
        TestRecorder::new(Test::new(7, "checkout"))
    }

    #[test]
    fn end_without_start_fails() {
        let recorder = recorder();
        let err = recorder.end(true).unwrap_err();
        assert_eq!(err.reason, "Test 7 (checkout) isn't started on this thread");
        assert_eq!(recorder.summary().successes, 0);
    }

    #[test]
    fn only_outermost_bracket_is_counted() {
        let recorder = recorder();

        recorder.start().unwrap();
        recorder.start().unwrap();
        recorder.end(false).unwrap();
        recorder.end(true).unwrap();

        let summary = recorder.summary();
        assert_eq!(summary.successes, 1);
        assert_eq!(summary.errors, 0);
    }

    #[test]
    fn errors_are_counted() {
        let recorder = recorder();

        for success in [true, false, false] {
            recorder.start().unwrap();
            recorder.end(success).unwrap();
        }

        let summary = recorder.summary();
        assert_eq!(summary.successes, 1);
        assert_eq!(summary.errors, 2);
        assert_eq!(summary.executions(), 3);
    }

    #[test]
    fn nesting_is_per_thread() {
        let recorder = Arc::new(recorder());
        recorder.start().unwrap();

        let other = recorder.clone();
        thread::spawn(move || {
            assert!(other.end(true).is_err());
            other.start().unwrap();
            other.end(true).unwrap();
        })
        .join()
        .unwrap();

        recorder.end(true).unwrap();
        assert_eq!(recorder.summary().successes, 2);
    }
}
