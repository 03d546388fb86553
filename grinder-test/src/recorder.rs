use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use grinder_core::{Recorder, RecorderError};

/// A recorder counting its calls. Can be made to fail.
#[derive(Default)]
pub struct CountingRecorder {
    started: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    fail_start: AtomicBool,
    fail_end: AtomicBool,
}

impl CountingRecorder {
    /// Makes every following `start` fail.
    pub fn fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    /// Makes every following `end` fail. The call is still counted.
    pub fn fail_end(&self, fail: bool) {
        self.fail_end.store(fail, Ordering::SeqCst);
    }

    /// The number of successful `start` calls.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// The number of `end` calls.
    pub fn ended(&self) -> usize {
        self.succeeded() + self.failed()
    }

    /// The number of `end(true)` calls.
    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::SeqCst)
    }

    /// The number of `end(false)` calls.
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }
}

impl Recorder for CountingRecorder {
    fn start(&self) -> Result<(), RecorderError> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(RecorderError::new("start is broken"));
        }

        self.started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn end(&self, success: bool) -> Result<(), RecorderError> {
        let counter = if success {
            &self.succeeded
        } else {
            &self.failed
        };
        counter.fetch_add(1, Ordering::SeqCst);

        if self.fail_end.load(Ordering::SeqCst) {
            return Err(RecorderError::new("end is broken"));
        }

        Ok(())
    }
}
