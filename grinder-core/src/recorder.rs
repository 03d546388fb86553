use std::{fmt, sync::Arc};

use tracing::error;

use crate::{
    errors::{InvokeError, RecorderError},
    test_case::Test,
};

/// Brackets a unit of instrumented work.
///
/// Implemented by the statistics subsystem. `end` is called exactly once for
/// every successful `start`, with `success` telling whether the work
/// completed without an error.
pub trait Recorder: Send + Sync + 'static {
    /// Starts a unit of work on the current thread.
    fn start(&self) -> Result<(), RecorderError>;

    /// Ends the unit of work started last on the current thread.
    fn end(&self, success: bool) -> Result<(), RecorderError>;
}

/// Provides a recorder for every registered test.
pub trait RecorderFactory: Send + Sync {
    /// Returns the recorder measuring `test`.
    fn recorder_for(&self, test: &Test) -> Arc<dyn Recorder>;
}

/// Runs `body` bracketed by `recorders`.
///
/// Recorders are started in order and ended in reverse order. If some
/// `start` fails, the already started recorders are ended with
/// `success = false` and `body` is not run. Every started recorder is ended
/// even if another `end` fails; the first such failure is returned.
pub fn bracket<R, E>(
    recorders: &[&dyn Recorder],
    body: impl FnOnce() -> Result<R, E>,
) -> Result<R, InvokeError<E>>
where
    E: fmt::Display,
{
    for (started, recorder) in recorders.iter().enumerate() {
        if let Err(err) = recorder.start() {
            if let Err(end_err) = end_all(&recorders[..started], false) {
                error!(error = %end_err, "cannot end recording after a failed start");
            }
            return Err(InvokeError::Recorder(err));
        }
    }

    let result = body();

    match end_all(recorders, result.is_ok()) {
        Ok(()) => result.map_err(InvokeError::Target),
        Err(err) => {
            if let Err(body_err) = &result {
                error!(error = %body_err, "instrumented call failed, but its recording failed too");
            }
            Err(InvokeError::Recorder(err))
        }
    }
}

fn end_all(started: &[&dyn Recorder], success: bool) -> Result<(), RecorderError> {
    let mut first_error = None;

    for recorder in started.iter().rev() {
        if let Err(err) = recorder.end(success) {
            first_error.get_or_insert(err);
        }
    }

    first_error.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct Journal(Mutex<Vec<String>>);

    impl Journal {
        fn push(&self, entry: String) {
            self.0.lock().push(entry);
        }

        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.0.lock())
        }
    }

    struct Named {
        name: &'static str,
        journal: &'static Journal,
        fail_start: bool,
        fail_end: bool,
    }

    impl Named {
        fn new(name: &'static str, journal: &'static Journal) -> Self {
            Self {
                name,
                journal,
                fail_start: false,
                fail_end: false,
            }
        }
    }

    // `Recorder` requires `'static`, so tests leak the journal.
    fn leak(journal: Journal) -> &'static Journal {
        Box::leak(Box::new(journal))
    }

    impl Recorder for Named {
        fn start(&self) -> Result<(), RecorderError> {
            self.journal.push(format!("start {}", self.name));
            if self.fail_start {
                return Err(RecorderError::new("start"));
            }
            Ok(())
        }

        fn end(&self, success: bool) -> Result<(), RecorderError> {
            self.journal.push(format!("end {} {success}", self.name));
            if self.fail_end {
                return Err(RecorderError::new(self.name));
            }
            Ok(())
        }
    }

    #[test]
    fn it_brackets_in_order() {
        let journal = leak(Journal::default());
        let a = Named::new("a", journal);
        let b = Named::new("b", journal);

        let res = bracket(&[&a as &dyn Recorder, &b], || {
            journal.push("body".into());
            Ok::<_, String>(42)
        });

        assert_eq!(res.unwrap(), 42);
        assert_eq!(
            journal.take(),
            ["start a", "start b", "body", "end b true", "end a true"]
        );
    }

    #[test]
    fn it_reports_body_failure() {
        let journal = leak(Journal::default());
        let a = Named::new("a", journal);

        let res = bracket(&[&a as &dyn Recorder], || Err::<(), _>("boom"));

        assert_eq!(res.unwrap_err().into_target(), Some("boom"));
        assert_eq!(journal.take(), ["start a", "end a false"]);
    }

    #[test]
    fn failed_start_skips_body() {
        let journal = leak(Journal::default());
        let a = Named::new("a", journal);
        let mut b = Named::new("b", journal);
        b.fail_start = true;
        let c = Named::new("c", journal);

        let res = bracket(&[&a as &dyn Recorder, &b, &c], || {
            journal.push("body".into());
            Ok::<_, String>(())
        });

        assert!(res.unwrap_err().is_recorder());
        assert_eq!(journal.take(), ["start a", "start b", "end a false"]);
    }

    #[test]
    fn failed_end_is_surfaced_and_others_still_end() {
        let journal = leak(Journal::default());
        let mut a = Named::new("a", journal);
        a.fail_end = true;
        let mut b = Named::new("b", journal);
        b.fail_end = true;

        let res = bracket(&[&a as &dyn Recorder, &b], || Ok::<_, String>(()));

        match res {
            Err(InvokeError::Recorder(err)) => assert_eq!(err.reason, "b"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(
            journal.take(),
            ["start a", "start b", "end b true", "end a true"]
        );
    }

    #[test]
    fn no_recorders() {
        let res = bracket(&[], || Ok::<_, String>(1));
        assert_eq!(res.unwrap(), 1);
    }
}
