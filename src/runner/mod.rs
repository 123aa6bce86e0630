//! Execution engine.
//!
//! A single-threaded scheduler dispatches test cases to a pool of isolated
//! worker processes over message-passing IPC, handles retries and crash
//! recovery, and aggregates per-test results into a run result for report
//! writers.

pub mod artifacts;
pub mod executor;
pub mod ipc;
pub mod queue;
pub mod results;
pub mod scheduler;
pub mod worker;

pub use artifacts::{ArtifactCollector, sanitize_filename};
pub use executor::{ExecutionContext, execute_test};
pub use ipc::{WorkerRequest, WorkerResponse};
pub use queue::WorkQueue;
pub use results::{
    AssertionDetails, FailedRequest, RunResult, RunSummary, TestArtifacts, TestError, TestResult,
    TestStatus,
};
pub use scheduler::{
    ProcessLauncher, Scheduler, SchedulerEvent, WorkerChannel, WorkerId, WorkerLauncher,
};

use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::model::TestSuite;

/// Run `suites` with real worker processes and settle into a run result.
pub async fn run_suites(
    config: RunnerConfig,
    suites: Vec<TestSuite>,
) -> Result<RunResult, RunnerError> {
    Scheduler::new(config).run(suites).await
}
