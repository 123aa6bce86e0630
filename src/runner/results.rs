//! Test and run results.
//!
//! Every outcome is a tagged value; report writers consume these without
//! touching engine internals. Summary counts are always consistent with
//! the result list they were built from.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RunnerConfig;
use crate::model::AssertionType;

/// Terminal status of one test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
    PassedWithRetry,
}

/// Expected/actual pair for a failed assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionDetails {
    pub expected: String,
    pub actual: String,
    pub selector: String,
    pub assertion_type: AssertionType,
}

/// A network response with status >= 400 captured during a test.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedRequest {
    pub url: String,
    pub status: u16,
    #[serde(default)]
    pub status_text: String,
}

/// Failure context attached to a failed test.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestError {
    pub message: String,
    #[serde(default)]
    pub stack: Option<String>,
    #[serde(default)]
    pub console_errors: Vec<String>,
    #[serde(default)]
    pub failed_requests: Vec<FailedRequest>,
    #[serde(default)]
    pub assertion_details: Option<AssertionDetails>,
}

/// Artifact locations captured for a test.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestArtifacts {
    #[serde(default)]
    pub screenshot_path: Option<PathBuf>,
    #[serde(default)]
    pub log_path: Option<PathBuf>,
    #[serde(default)]
    pub artifact_dir: Option<PathBuf>,
}

/// Outcome of one test case. `error` is populated iff the status is
/// `Failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub test_id: String,
    pub test_name: String,
    pub suite: String,
    pub status: TestStatus,
    pub duration_ms: u64,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub error: Option<TestError>,
    #[serde(default)]
    pub artifacts: TestArtifacts,
}

/// Aggregate counts over a result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub passed_with_retry: usize,
    pub duration_ms: u64,
}

impl RunSummary {
    #[must_use]
    pub fn from_results(results: &[TestResult], duration_ms: u64) -> Self {
        let count = |status: TestStatus| results.iter().filter(|r| r.status == status).count();
        Self {
            total: results.len(),
            passed: count(TestStatus::Passed),
            failed: count(TestStatus::Failed),
            skipped: count(TestStatus::Skipped),
            passed_with_retry: count(TestStatus::PassedWithRetry),
            duration_ms,
        }
    }
}

/// Output of a settled run, in completion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub config: RunnerConfig,
    pub results: Vec<TestResult>,
    pub summary: RunSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, status: TestStatus) -> TestResult {
        TestResult {
            test_id: id.to_string(),
            test_name: id.to_string(),
            suite: "suite".to_string(),
            status,
            duration_ms: 10,
            retry_count: 0,
            error: None,
            artifacts: TestArtifacts::default(),
        }
    }

    #[test]
    fn summary_counts_sum_to_total() {
        let results = vec![
            result("a", TestStatus::Passed),
            result("b", TestStatus::Failed),
            result("c", TestStatus::PassedWithRetry),
            result("d", TestStatus::Passed),
        ];
        let summary = RunSummary::from_results(&results, 1000);
        assert_eq!(summary.total, 4);
        assert_eq!(
            summary.passed + summary.failed + summary.skipped + summary.passed_with_retry,
            summary.total
        );
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.passed_with_retry, 1);
    }
}
