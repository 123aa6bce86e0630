//! Worker-pool supervision.
//!
//! The scheduler is a single event loop: it spawns a fixed pool of worker
//! processes, feeds them test cases over stdin, and folds their responses
//! and exit events into retry accounting and the final result list. All
//! mutable state lives here; workers share nothing.
//!
//! Worker processes are created through the [`WorkerLauncher`] seam so the
//! supervision logic can be exercised against scripted in-process workers.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::model::{TestCase, TestSuite};

use super::ipc::{WorkerRequest, WorkerResponse, parse_message, write_message};
use super::queue::WorkQueue;
use super::results::{RunResult, RunSummary, TestArtifacts, TestError, TestResult, TestStatus};

pub type WorkerId = u32;

/// Events folded into the scheduler loop.
#[derive(Debug)]
pub enum SchedulerEvent {
    Message {
        worker: WorkerId,
        response: WorkerResponse,
    },
    Exited {
        worker: WorkerId,
    },
}

/// Channel to one live worker.
#[async_trait]
pub trait WorkerChannel: Send {
    async fn send(&mut self, request: &WorkerRequest) -> Result<()>;

    /// Kill the worker and reap it. Idempotent.
    async fn terminate(&mut self);
}

/// Spawns workers and wires their events into the scheduler.
#[async_trait]
pub trait WorkerLauncher: Send + Sync {
    async fn spawn(
        &self,
        id: WorkerId,
        events: mpsc::UnboundedSender<SchedulerEvent>,
    ) -> Result<Box<dyn WorkerChannel>>;
}

/// Launches real `sentinel-worker` processes over stdio.
pub struct ProcessLauncher {
    worker_binary: Option<PathBuf>,
}

impl ProcessLauncher {
    #[must_use]
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            worker_binary: config.worker_binary.clone(),
        }
    }

    fn resolve_binary(&self) -> Result<PathBuf> {
        if let Some(binary) = &self.worker_binary {
            return Ok(binary.clone());
        }
        let exe = std::env::current_exe().context("Cannot locate current executable")?;
        let dir = exe
            .parent()
            .context("Current executable has no parent directory")?;
        Ok(dir.join("sentinel-worker"))
    }
}

struct ProcessChannel {
    child: Child,
    stdin: ChildStdin,
}

#[async_trait]
impl WorkerChannel for ProcessChannel {
    async fn send(&mut self, request: &WorkerRequest) -> Result<()> {
        write_message(&mut self.stdin, request)
            .await
            .context("Worker stdin write failed")
    }

    async fn terminate(&mut self) {
        if let Err(e) = self.child.start_kill() {
            debug!("Worker already terminated: {e}");
        }
        if let Err(e) = self.child.wait().await {
            warn!("Worker reap failed: {e}");
        }
    }
}

#[async_trait]
impl WorkerLauncher for ProcessLauncher {
    async fn spawn(
        &self,
        id: WorkerId,
        events: mpsc::UnboundedSender<SchedulerEvent>,
    ) -> Result<Box<dyn WorkerChannel>> {
        let binary = self.resolve_binary()?;
        let mut child = Command::new(&binary)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn worker {}", binary.display()))?;

        let stdin = child.stdin.take().context("Worker stdin unavailable")?;
        let stdout = child.stdout.take().context("Worker stdout unavailable")?;

        // Reader task: forwards responses, then signals exit when the pipe
        // closes. Channel loss and process death look identical here, which
        // is exactly the crash semantics the scheduler wants.
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if let Some(response) = parse_message::<WorkerResponse>(&line) {
                            if events
                                .send(SchedulerEvent::Message {
                                    worker: id,
                                    response,
                                })
                                .is_err()
                            {
                                break;
                            }
                        } else {
                            debug!("Ignoring malformed line from worker {id}");
                        }
                    }
                    Ok(None) | Err(_) => break,
                }
            }
            let _ = events.send(SchedulerEvent::Exited { worker: id });
        });

        Ok(Box::new(ProcessChannel { child, stdin }))
    }
}

struct Slot {
    channel: Box<dyn WorkerChannel>,
    current: Option<TestCase>,
}

/// Supervises one run over a fixed pool of isolated workers.
pub struct Scheduler {
    config: RunnerConfig,
}

impl Scheduler {
    #[must_use]
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Run the suites with real worker processes.
    pub async fn run(&self, suites: Vec<TestSuite>) -> Result<RunResult, RunnerError> {
        let launcher = ProcessLauncher::new(&self.config);
        self.run_with_launcher(&launcher, suites).await
    }

    /// Run the suites with a caller-supplied worker launcher.
    ///
    /// Settles exactly once: when the queue is empty and every worker is
    /// idle. After pre-flight validation this never fails; worker trouble
    /// becomes per-test results.
    pub async fn run_with_launcher(
        &self,
        launcher: &dyn WorkerLauncher,
        suites: Vec<TestSuite>,
    ) -> Result<RunResult, RunnerError> {
        self.config.validate()?;
        let total: usize = suites.iter().map(|s| s.test_cases.len()).sum();
        if total == 0 {
            return Err(RunnerError::NoTestsFound);
        }

        let started_at = Utc::now();
        let run_id = Uuid::new_v4().to_string();
        info!(
            "Run {run_id} starting: {total} tests across {} workers",
            self.config.workers
        );

        let mut queue = WorkQueue::new();
        queue.enqueue_suites(suites);

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let mut slots: HashMap<WorkerId, Slot> = HashMap::new();
        let mut attempts: HashMap<String, u32> = HashMap::new();
        let mut crashes: HashMap<String, u32> = HashMap::new();
        let mut results: Vec<TestResult> = Vec::new();
        let mut next_worker: WorkerId = 0;

        for _ in 0..self.config.workers {
            next_worker += 1;
            let channel = launcher
                .spawn(next_worker, events_tx.clone())
                .await
                .map_err(|e| RunnerError::InvalidConfig(format!("Worker spawn failed: {e:#}")))?;
            slots.insert(
                next_worker,
                Slot {
                    channel,
                    current: None,
                },
            );
        }

        let ids: Vec<WorkerId> = slots.keys().copied().collect();
        for id in ids {
            self.dispatch(id, &mut slots, &mut queue, &mut attempts).await;
        }

        loop {
            if queue.is_empty() && slots.values().all(|slot| slot.current.is_none()) {
                break;
            }
            if slots.is_empty() {
                error!("No workers left; abandoning {} queued tests", queue.len());
                break;
            }
            let Some(event) = events_rx.recv().await else {
                break;
            };

            match event {
                SchedulerEvent::Message { worker, response } => {
                    let Some(slot) = slots.get_mut(&worker) else {
                        continue;
                    };
                    let Some(test) = slot.current.take() else {
                        debug!("Unsolicited message from idle worker {worker}");
                        continue;
                    };
                    let attempt = attempts.get(&test.id).copied().unwrap_or(0);

                    match response {
                        WorkerResponse::Result { mut result } => {
                            if result.status == TestStatus::Failed
                                && attempt < self.config.retries
                            {
                                attempts.insert(test.id.clone(), attempt + 1);
                                debug!(
                                    "Test {} failed attempt {}, requeueing",
                                    test.id,
                                    attempt + 1
                                );
                                queue.requeue(test);
                            } else {
                                if result.status == TestStatus::Passed && attempt > 0 {
                                    result.status = TestStatus::PassedWithRetry;
                                }
                                result.retry_count = attempt;
                                results.push(result);
                            }
                        }
                        WorkerResponse::Error { error } => {
                            if attempt < self.config.retries {
                                attempts.insert(test.id.clone(), attempt + 1);
                                debug!("Worker {worker} errored on {}: {error}", test.id);
                                queue.requeue(test);
                            } else {
                                results.push(failed_result(&test, attempt, error));
                            }
                        }
                    }
                    self.dispatch(worker, &mut slots, &mut queue, &mut attempts).await;
                }
                SchedulerEvent::Exited { worker } => {
                    let Some(mut slot) = slots.remove(&worker) else {
                        continue;
                    };
                    slot.channel.terminate().await;

                    if let Some(test) = slot.current.take() {
                        let crash_count = crashes.entry(test.id.clone()).or_insert(0);
                        *crash_count += 1;
                        warn!(
                            "Worker {worker} crashed during {} (crash {})",
                            test.id, crash_count
                        );
                        if *crash_count <= self.config.retries + 1 {
                            queue.requeue(test);
                        } else {
                            let attempt = attempts.get(&test.id).copied().unwrap_or(0);
                            let message = format!(
                                "Worker crashed {crash_count} times for test \"{}\"",
                                test.name
                            );
                            results.push(failed_result(&test, attempt, message));
                        }
                    }

                    next_worker += 1;
                    match launcher.spawn(next_worker, events_tx.clone()).await {
                        Ok(channel) => {
                            slots.insert(
                                next_worker,
                                Slot {
                                    channel,
                                    current: None,
                                },
                            );
                            self.dispatch(next_worker, &mut slots, &mut queue, &mut attempts)
                                .await;
                        }
                        Err(e) => error!("Failed to spawn replacement worker: {e:#}"),
                    }
                }
            }
        }

        for slot in slots.values_mut() {
            slot.channel.terminate().await;
        }

        let completed_at = Utc::now();
        let duration_ms =
            u64::try_from((completed_at - started_at).num_milliseconds()).unwrap_or(0);
        let summary = RunSummary::from_results(&results, duration_ms);
        info!(
            "Run {run_id} settled: {}/{} passed in {duration_ms}ms",
            summary.passed + summary.passed_with_retry,
            summary.total
        );

        Ok(RunResult {
            run_id,
            started_at,
            completed_at,
            config: self.config.clone(),
            results,
            summary,
        })
    }

    /// Hand the next queued test to an idle worker. A failed send requeues
    /// the test at the head and leaves the worker idle; the broken pipe
    /// will surface as an exit event shortly.
    async fn dispatch(
        &self,
        worker: WorkerId,
        slots: &mut HashMap<WorkerId, Slot>,
        queue: &mut WorkQueue,
        attempts: &mut HashMap<String, u32>,
    ) {
        let Some(slot) = slots.get_mut(&worker) else {
            return;
        };
        if slot.current.is_some() {
            return;
        }
        let Some(test) = queue.dequeue() else {
            return;
        };
        attempts.entry(test.id.clone()).or_insert(0);

        let request = WorkerRequest::Execute {
            test_case: test.clone(),
            config: self.config.clone(),
        };
        match slot.channel.send(&request).await {
            Ok(()) => slot.current = Some(test),
            Err(e) => {
                warn!("Dispatch to worker {worker} failed: {e:#}");
                queue.requeue(test);
            }
        }
    }
}

fn failed_result(test: &TestCase, retry_count: u32, message: String) -> TestResult {
    TestResult {
        test_id: test.id.clone(),
        test_name: test.name.clone(),
        suite: test.suite.clone(),
        status: TestStatus::Failed,
        duration_ms: 0,
        retry_count,
        error: Some(TestError {
            message,
            ..TestError::default()
        }),
        artifacts: TestArtifacts::default(),
    }
}
