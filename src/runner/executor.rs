//! Test execution against a single page.
//!
//! Steps run in setup, main, teardown order; after every step each of its
//! assertions is evaluated. The first assertion failure or driver exception
//! fails the test, captures artifacts, and carries the collected console
//! errors and failed network requests into the result.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::debug;

use crate::browser::{BrowserEngine, NavigateOptions, PageId};
use crate::config::RunnerConfig;
use crate::model::{AssertionType, StepAction, TestAssertion, TestCase, TestStep};

use super::artifacts::ArtifactCollector;
use super::results::{
    AssertionDetails, FailedRequest, TestArtifacts, TestError, TestResult, TestStatus,
};

/// Assertion wait budget for `visibility` checks.
const SELECTOR_WAIT: Duration = Duration::from_secs(5);

/// Everything a single test execution needs.
pub struct ExecutionContext<'a> {
    pub engine: &'a dyn BrowserEngine,
    pub page: PageId,
    pub config: &'a RunnerConfig,
    pub artifacts: &'a ArtifactCollector,
    /// Console errors accumulated by the worker's console listener
    pub console_errors: Arc<Mutex<Vec<String>>>,
    /// Responses with status >= 400 captured by the context interceptor
    pub failed_requests: Arc<Mutex<Vec<FailedRequest>>>,
}

struct Failure {
    message: String,
    assertion_details: Option<AssertionDetails>,
}

impl Failure {
    fn exception(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            assertion_details: None,
        }
    }
}

enum AssertionOutcome {
    Passed,
    Failed { actual: String },
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Execute one test case, returning its result with artifacts captured on
/// failure. Never panics or propagates driver errors.
pub async fn execute_test(ctx: &ExecutionContext<'_>, test: &TestCase) -> TestResult {
    let started = Instant::now();
    let outcome = run_test_body(ctx, test).await;
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    match outcome {
        Ok(()) => TestResult {
            test_id: test.id.clone(),
            test_name: test.name.clone(),
            suite: test.suite.clone(),
            status: TestStatus::Passed,
            duration_ms,
            retry_count: 0,
            error: None,
            artifacts: TestArtifacts::default(),
        },
        Err(failure) => {
            let console_errors = ctx
                .console_errors
                .lock()
                .map(|errors| errors.clone())
                .unwrap_or_default();
            let failed_requests = ctx
                .failed_requests
                .lock()
                .map(|requests| requests.clone())
                .unwrap_or_default();
            let artifacts = ctx
                .artifacts
                .collect(ctx.engine, ctx.page, &test.suite, &test.id, &console_errors)
                .await;
            TestResult {
                test_id: test.id.clone(),
                test_name: test.name.clone(),
                suite: test.suite.clone(),
                status: TestStatus::Failed,
                duration_ms,
                retry_count: 0,
                error: Some(TestError {
                    message: failure.message,
                    stack: None,
                    console_errors,
                    failed_requests,
                    assertion_details: failure.assertion_details,
                }),
                artifacts,
            }
        }
    }
}

async fn run_test_body(ctx: &ExecutionContext<'_>, test: &TestCase) -> Result<(), Failure> {
    if let Some(base_url) = &ctx.config.base_url {
        let opts = NavigateOptions {
            timeout: Some(Duration::from_millis(ctx.config.timeout_ms)),
        };
        ctx.engine
            .navigate(ctx.page, base_url, opts)
            .await
            .map_err(|e| Failure::exception(e.to_string()))?;
    }

    for step in test
        .setup
        .iter()
        .chain(&test.steps)
        .chain(&test.teardown)
    {
        run_step(ctx, step).await?;
        for assertion in &step.assertions {
            match evaluate_assertion(ctx, assertion).await? {
                AssertionOutcome::Passed => {}
                AssertionOutcome::Failed { actual } => {
                    let label = if assertion.description.is_empty() {
                        format!("{:?}", assertion.assertion_type)
                    } else {
                        assertion.description.clone()
                    };
                    return Err(Failure {
                        message: format!(
                            "Assertion failed: {label} (expected {:?}, got {actual:?})",
                            assertion.expected
                        ),
                        assertion_details: Some(AssertionDetails {
                            expected: assertion.expected.clone(),
                            actual,
                            selector: assertion.selector.clone(),
                            assertion_type: assertion.assertion_type,
                        }),
                    });
                }
            }
        }
    }
    Ok(())
}

async fn run_step(ctx: &ExecutionContext<'_>, step: &TestStep) -> Result<(), Failure> {
    match step.action {
        StepAction::Click => ctx
            .engine
            .click(ctx.page, &step.selector)
            .await
            .map_err(|e| Failure::exception(e.to_string())),
        StepAction::Navigation => {
            let opts = NavigateOptions {
                timeout: Some(Duration::from_millis(ctx.config.timeout_ms)),
            };
            ctx.engine
                .navigate(ctx.page, &step.selector, opts)
                .await
                .map(|_| ())
                .map_err(|e| Failure::exception(e.to_string()))
        }
        // Form values are filled by generator-supplied steps; submission is
        // a click on the submit control.
        StepAction::FormSubmit => ctx
            .engine
            .click(ctx.page, &step.selector)
            .await
            .map_err(|e| Failure::exception(e.to_string())),
        StepAction::Other => {
            debug!("Skipping unknown step action on {:?}", step.selector);
            Ok(())
        }
    }
}

async fn evaluate_assertion(
    ctx: &ExecutionContext<'_>,
    assertion: &TestAssertion,
) -> Result<AssertionOutcome, Failure> {
    let actual = match assertion.assertion_type {
        AssertionType::Visibility => {
            let present = ctx
                .engine
                .wait_for_selector(ctx.page, &assertion.selector, SELECTOR_WAIT)
                .await
                .map_err(|e| Failure::exception(e.to_string()))?;
            if present { "true" } else { "false" }.to_string()
        }
        AssertionType::TextContent => {
            let script = format!(
                "(() => document.querySelector({})?.textContent ?? '')()",
                js_string(&assertion.selector)
            );
            ctx.engine
                .evaluate(ctx.page, &script)
                .await
                .map_err(|e| Failure::exception(e.to_string()))?
                .as_str()
                .unwrap_or_default()
                .to_string()
        }
        AssertionType::UrlMatch => ctx
            .engine
            .current_url(ctx.page)
            .await
            .map_err(|e| Failure::exception(e.to_string()))?,
        AssertionType::ElementCount => {
            let script = format!(
                "(() => document.querySelectorAll({}).length)()",
                js_string(&assertion.selector)
            );
            ctx.engine
                .evaluate(ctx.page, &script)
                .await
                .map_err(|e| Failure::exception(e.to_string()))?
                .as_u64()
                .unwrap_or_default()
                .to_string()
        }
        AssertionType::AttributeValue => {
            let script = format!(
                "(() => document.querySelector({})?.getAttribute('value') ?? '')()",
                js_string(&assertion.selector)
            );
            ctx.engine
                .evaluate(ctx.page, &script)
                .await
                .map_err(|e| Failure::exception(e.to_string()))?
                .as_str()
                .unwrap_or_default()
                .to_string()
        }
    };

    let passed = match assertion.assertion_type {
        // Substring containment rather than equality.
        AssertionType::UrlMatch => actual.contains(&assertion.expected),
        _ => actual == assertion.expected,
    };
    if passed {
        Ok(AssertionOutcome::Passed)
    } else {
        Ok(AssertionOutcome::Failed { actual })
    }
}
