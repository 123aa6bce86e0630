//! Scheduler supervision scenarios with scripted in-process workers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use sentinel::config::RunnerConfig;
use sentinel::model::{TestCase, TestSuite};
use sentinel::runner::scheduler::{SchedulerEvent, WorkerChannel, WorkerId, WorkerLauncher};
use sentinel::runner::{
    Scheduler, TestArtifacts, TestResult, TestStatus, WorkerRequest, WorkerResponse,
};
use tokio::sync::mpsc::UnboundedSender;

/// What a scripted worker does with the Nth execution of a given test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Pass,
    Fail,
    Error,
    Crash,
}

/// Per-test script: action at execution index, last entry repeats.
#[derive(Clone, Default)]
struct Script {
    actions: HashMap<String, Vec<Action>>,
}

impl Script {
    fn with(mut self, test_id: &str, actions: &[Action]) -> Self {
        self.actions.insert(test_id.to_string(), actions.to_vec());
        self
    }

    fn action_for(&self, test_id: &str, execution: usize) -> Action {
        let Some(actions) = self.actions.get(test_id) else {
            return Action::Pass;
        };
        actions
            .get(execution)
            .or_else(|| actions.last())
            .copied()
            .unwrap_or(Action::Pass)
    }
}

struct ScriptedLauncher {
    script: Script,
    executions: Arc<Mutex<HashMap<String, usize>>>,
    spawned: AtomicU32,
}

impl ScriptedLauncher {
    fn new(script: Script) -> Self {
        Self {
            script,
            executions: Arc::new(Mutex::new(HashMap::new())),
            spawned: AtomicU32::new(0),
        }
    }
}

struct ScriptedChannel {
    id: WorkerId,
    script: Script,
    executions: Arc<Mutex<HashMap<String, usize>>>,
    events: UnboundedSender<SchedulerEvent>,
}

fn result_for(test: &TestCase, status: TestStatus) -> TestResult {
    TestResult {
        test_id: test.id.clone(),
        test_name: test.name.clone(),
        suite: test.suite.clone(),
        status,
        duration_ms: 5,
        retry_count: 0,
        error: None,
        artifacts: TestArtifacts::default(),
    }
}

#[async_trait]
impl WorkerChannel for ScriptedChannel {
    async fn send(&mut self, request: &WorkerRequest) -> Result<()> {
        let WorkerRequest::Execute { test_case, .. } = request;
        let execution = {
            let mut executions = self.executions.lock().unwrap();
            let counter = executions.entry(test_case.id.clone()).or_insert(0);
            let current = *counter;
            *counter += 1;
            current
        };

        let event = match self.script.action_for(&test_case.id, execution) {
            Action::Pass => SchedulerEvent::Message {
                worker: self.id,
                response: WorkerResponse::Result {
                    result: result_for(test_case, TestStatus::Passed),
                },
            },
            Action::Fail => SchedulerEvent::Message {
                worker: self.id,
                response: WorkerResponse::Result {
                    result: result_for(test_case, TestStatus::Failed),
                },
            },
            Action::Error => SchedulerEvent::Message {
                worker: self.id,
                response: WorkerResponse::Error {
                    error: format!("browser exploded on {}", test_case.id),
                },
            },
            Action::Crash => SchedulerEvent::Exited { worker: self.id },
        };
        let _ = self.events.send(event);
        Ok(())
    }

    async fn terminate(&mut self) {}
}

#[async_trait]
impl WorkerLauncher for ScriptedLauncher {
    async fn spawn(
        &self,
        id: WorkerId,
        events: UnboundedSender<SchedulerEvent>,
    ) -> Result<Box<dyn WorkerChannel>> {
        self.spawned.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedChannel {
            id,
            script: self.script.clone(),
            executions: Arc::clone(&self.executions),
            events,
        }))
    }
}

fn test_case(id: &str) -> TestCase {
    TestCase {
        id: id.to_string(),
        name: format!("test {id}"),
        suite: "suite".to_string(),
        setup: Vec::new(),
        steps: Vec::new(),
        teardown: Vec::new(),
        metadata: Default::default(),
    }
}

fn suite(ids: &[&str]) -> Vec<TestSuite> {
    vec![TestSuite {
        name: "suite".to_string(),
        test_cases: ids.iter().map(|id| test_case(id)).collect(),
    }]
}

fn config(workers: usize, retries: u32) -> RunnerConfig {
    RunnerConfig {
        workers,
        retries,
        ..RunnerConfig::default()
    }
}

#[tokio::test]
async fn fail_then_pass_becomes_passed_with_retry() {
    let launcher = ScriptedLauncher::new(Script::default().with("flaky", &[Action::Fail, Action::Pass]));
    let run = Scheduler::new(config(1, 2))
        .run_with_launcher(&launcher, suite(&["flaky"]))
        .await
        .unwrap();

    assert_eq!(run.results.len(), 1);
    let result = &run.results[0];
    assert_eq!(result.status, TestStatus::PassedWithRetry);
    assert_eq!(result.retry_count, 1);
    assert_eq!(run.summary.passed_with_retry, 1);
}

#[tokio::test]
async fn retries_exhaust_into_a_failed_result() {
    let launcher = ScriptedLauncher::new(Script::default().with("doomed", &[Action::Fail]));
    let run = Scheduler::new(config(1, 2))
        .run_with_launcher(&launcher, suite(&["doomed"]))
        .await
        .unwrap();

    let result = &run.results[0];
    assert_eq!(result.status, TestStatus::Failed);
    assert_eq!(result.retry_count, 2);
    // First attempt plus one requeue per retry.
    assert_eq!(*launcher.executions.lock().unwrap().get("doomed").unwrap(), 3);
}

#[tokio::test]
async fn worker_error_counts_as_a_failed_attempt() {
    let launcher =
        ScriptedLauncher::new(Script::default().with("ipc", &[Action::Error, Action::Pass]));
    let run = Scheduler::new(config(1, 1))
        .run_with_launcher(&launcher, suite(&["ipc"]))
        .await
        .unwrap();

    let result = &run.results[0];
    assert_eq!(result.status, TestStatus::PassedWithRetry);
    assert_eq!(result.retry_count, 1);
}

#[tokio::test]
async fn exhausted_errors_fabricate_a_failed_result() {
    let launcher = ScriptedLauncher::new(Script::default().with("ipc", &[Action::Error]));
    let run = Scheduler::new(config(1, 1))
        .run_with_launcher(&launcher, suite(&["ipc"]))
        .await
        .unwrap();

    let result = &run.results[0];
    assert_eq!(result.status, TestStatus::Failed);
    assert_eq!(result.retry_count, 1);
    let error = result.error.as_ref().expect("fabricated error expected");
    assert!(error.message.contains("browser exploded"));
}

#[tokio::test]
async fn crashed_worker_is_replaced_and_the_test_retried() {
    let launcher = ScriptedLauncher::new(
        Script::default()
            .with("crashy", &[Action::Crash, Action::Pass])
            .with("steady", &[Action::Pass]),
    );
    let run = Scheduler::new(config(2, 1))
        .run_with_launcher(&launcher, suite(&["crashy", "steady"]))
        .await
        .unwrap();

    assert_eq!(run.results.len(), 2);
    let by_id: HashMap<&str, &TestResult> = run
        .results
        .iter()
        .map(|r| (r.test_id.as_str(), r))
        .collect();
    assert_eq!(by_id["crashy"].status, TestStatus::Passed);
    assert_eq!(by_id["steady"].status, TestStatus::Passed);
    // Two initial workers plus at least one replacement.
    assert!(launcher.spawned.load(Ordering::SeqCst) >= 3);
}

#[tokio::test]
async fn crash_budget_exhaustion_fabricates_a_crash_failure() {
    let launcher = ScriptedLauncher::new(Script::default().with("crashy", &[Action::Crash]));
    let run = Scheduler::new(config(1, 0))
        .run_with_launcher(&launcher, suite(&["crashy"]))
        .await
        .unwrap();

    let result = &run.results[0];
    assert_eq!(result.status, TestStatus::Failed);
    let error = result.error.as_ref().expect("crash failure expected");
    assert_eq!(
        error.message,
        "Worker crashed 2 times for test \"test crashy\""
    );
}

#[tokio::test]
async fn summary_is_consistent_with_results() {
    let launcher = ScriptedLauncher::new(
        Script::default()
            .with("a", &[Action::Pass])
            .with("b", &[Action::Fail])
            .with("c", &[Action::Fail, Action::Pass]),
    );
    let run = Scheduler::new(config(2, 1))
        .run_with_launcher(&launcher, suite(&["a", "b", "c"]))
        .await
        .unwrap();

    assert_eq!(run.summary.total, run.results.len());
    assert_eq!(
        run.summary.passed + run.summary.failed + run.summary.skipped
            + run.summary.passed_with_retry,
        run.summary.total
    );
    assert!(run.completed_at >= run.started_at);
}

#[tokio::test]
async fn empty_suites_fail_preflight_without_spawning() {
    let launcher = ScriptedLauncher::new(Script::default());
    let err = Scheduler::new(config(2, 1))
        .run_with_launcher(&launcher, vec![])
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NO_TESTS_FOUND");
    assert_eq!(launcher.spawned.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalid_config_fails_preflight() {
    let launcher = ScriptedLauncher::new(Script::default());
    let err = Scheduler::new(config(0, 1))
        .run_with_launcher(&launcher, suite(&["a"]))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_CONFIG");
}
