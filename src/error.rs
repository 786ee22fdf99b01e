// sptl: error taxonomy
//
// Only "Configuration failure" and "Invariant violation" ever materialize as
// an `Err`; estimator contention, undefined estimators, and dropped reports
// are internal control flow handled in place and never surface here.

use thiserror::Error;

/// Errors that can abort `launch` before the user body ever runs.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("configuration failure: {0}")]
    Configuration(#[from] ConfigError),

    #[error("failed to build worker pool with {requested} threads: {source}")]
    WorkerPool {
        requested: usize,
        #[source]
        source: rayon::ThreadPoolBuildError,
    },
}

/// Malformed or rejected configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {key} has an invalid value {value:?}: expected {expected}")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("cpu frequency could not be determined: {0}")]
    CpuFrequencyUnreadable(String),

    #[error("numa interleave policy rejected: {0}")]
    NumaPolicyRejected(String),
}

/// An unreachable internal state: an out-of-range worker id, a mode-stack
/// underflow, an unknown scan/reduce level combination. These are bugs, not
/// recoverable conditions, so the runtime logs and panics rather than
/// returning a `Result` that callers would have no sound way to handle.
#[derive(Debug, Error)]
#[error("invariant violation: {0}")]
pub struct InvariantViolation(pub String);

/// Panic with a traced diagnostic for an invariant violation.
#[inline(never)]
#[cold]
pub fn fail_invariant(message: impl Into<String>) -> ! {
    let violation = InvariantViolation(message.into());
    tracing::error!(error = %violation, "invariant violation");
    panic!("{violation}");
}
