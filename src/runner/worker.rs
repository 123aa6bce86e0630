//! Worker-process loop.
//!
//! Reads `execute` requests from stdin, runs each test in a browser that
//! lives only for that execution, and writes the tagged response to stdout.
//! Anything that is not an `execute` message is ignored. Cleanup always
//! runs, closing page, context, and browser in that order and swallowing
//! errors along the way.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::browser::{BrowserEngine, ChromiumEngine, LaunchOptions};
use crate::config::RunnerConfig;
use crate::model::TestCase;

use super::artifacts::ArtifactCollector;
use super::executor::{ExecutionContext, execute_test};
use super::ipc::{WorkerRequest, WorkerResponse, parse_message, write_message};
use super::results::{FailedRequest, TestResult};

/// Main loop of the `sentinel-worker` binary. Returns when stdin closes.
pub async fn run() -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    info!("Worker {} ready", std::process::id());

    while let Some(line) = lines
        .next_line()
        .await
        .context("Worker stdin read failed")?
    {
        let Some(request) = parse_message::<WorkerRequest>(&line) else {
            debug!("Ignoring unrecognized message");
            continue;
        };
        let WorkerRequest::Execute { test_case, config } = request;

        info!("Executing test {} ({})", test_case.id, test_case.name);
        let response = match execute_in_browser(&test_case, &config).await {
            Ok(result) => WorkerResponse::Result { result },
            Err(e) => WorkerResponse::Error {
                error: format!("{e:#}"),
            },
        };
        write_message(&mut stdout, &response)
            .await
            .context("Worker stdout write failed")?;
    }

    info!("Worker {} shutting down", std::process::id());
    Ok(())
}

/// One test, one browser. The browser is launched for this execution and
/// torn down before the response is sent.
async fn execute_in_browser(test: &TestCase, config: &RunnerConfig) -> Result<TestResult> {
    let engine = ChromiumEngine::new();
    engine
        .launch(&LaunchOptions {
            browser: config.browser,
            headless: config.headless,
        })
        .await
        .context("Browser launch failed")?;

    let session = async {
        let ctx = engine.create_context().await?;
        let page = engine.create_page(ctx).await?;
        Ok::<_, crate::browser::BrowserError>((ctx, page))
    }
    .await;

    let (ctx, page) = match session {
        Ok(pair) => pair,
        Err(e) => {
            if let Err(close_err) = engine.close().await {
                warn!("Browser close failed after setup error: {close_err}");
            }
            return Err(e).context("Browser session setup failed");
        }
    };

    // Every response with status >= 400 becomes failure context.
    let failed_requests: Arc<Mutex<Vec<FailedRequest>>> = Arc::new(Mutex::new(Vec::new()));
    let request_sink = Arc::clone(&failed_requests);
    let intercept = engine
        .on_response(
            ctx,
            Arc::new(move |response| {
                if response.status >= 400
                    && let Ok(mut list) = request_sink.lock()
                {
                    list.push(FailedRequest {
                        url: response.url,
                        status: response.status,
                        status_text: response.status_text,
                    });
                }
            }),
        )
        .await;
    if let Err(e) = intercept {
        warn!("Response interception unavailable: {e}");
    }

    let console_errors: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let console_sink = Arc::clone(&console_errors);
    let console = engine
        .on_console_error(
            page,
            Arc::new(move |message| {
                if let Ok(mut list) = console_sink.lock() {
                    list.push(message);
                }
            }),
        )
        .await;
    if let Err(e) = console {
        debug!("Console capture unavailable: {e}");
    }

    let artifacts = ArtifactCollector::new(&config.output_dir);
    let exec_ctx = ExecutionContext {
        engine: &engine,
        page,
        config,
        artifacts: &artifacts,
        console_errors,
        failed_requests,
    };
    let result = execute_test(&exec_ctx, test).await;

    if let Err(e) = engine.close_page(page).await {
        debug!("Page close failed: {e}");
    }
    if let Err(e) = engine.close_context(ctx).await {
        debug!("Context close failed: {e}");
    }
    if let Err(e) = engine.close().await {
        debug!("Browser close failed: {e}");
    }

    Ok(result)
}
