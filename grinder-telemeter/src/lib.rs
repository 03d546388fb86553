//! Per-test statistics.
//!
//! [`Statistics`] hands out a [`TestRecorder`] for every test. Recorders time
//! the outermost bracket on each thread, keep in-process totals and report to
//! the installed `metrics` recorder, if any:
//! * `grinder_test_time_seconds` (histogram)
//! * `grinder_tests_total` (counter)
//! * `grinder_test_errors_total` (counter)
//!
//! All of them are labelled with `test`.

pub use self::{
    recorder::TestRecorder,
    statistics::{Statistics, TestSummary},
};

mod recorder;
mod statistics;
