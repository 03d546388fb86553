//! Utils for testing instrumenters and weaving engines.

pub use self::{
    dcr::{DcrEvent, RecordingDcrContext},
    instrumenter::{StubAnswer, StubInstrumenter},
    recorder::CountingRecorder,
};

mod dcr;
mod instrumenter;
mod recorder;

/// Installs a `tracing` subscriber writing to the test output.
///
/// Filtered by `RUST_LOG`. Can be called many times.
pub fn setup_logger() {
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
