//! Pre-flight error surface for the execution engine.
//!
//! Once worker processes have been spawned the scheduler never fails;
//! everything that goes wrong afterwards is folded into per-test results.
//! These errors cover the validation phase before any process exists.

use thiserror::Error;

/// Errors reported before any worker is spawned.
#[derive(Debug, Clone, Error)]
pub enum RunnerError {
    /// Runner configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The supplied suites contained no test cases
    #[error("No test cases found in the supplied suites")]
    NoTestsFound,

    /// The target application could not be reached
    #[error("Target unreachable: {0}")]
    TargetUnreachable(String),

    /// The run exceeded its configured time budget
    #[error("Run timed out: {0}")]
    Timeout(String),
}

impl RunnerError {
    /// Stable machine-readable code for report writers.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::NoTestsFound => "NO_TESTS_FOUND",
            Self::TargetUnreachable(_) => "TARGET_UNREACHABLE",
            Self::Timeout(_) => "TIMEOUT",
        }
    }
}
