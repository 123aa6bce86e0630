//! Content-stability readiness waiting.
//!
//! Single-page applications keep mutating the document long after the load
//! event, so readiness is approximated by polling the body's innerHTML
//! length until it holds still for a full idle window. Polling is portable
//! across drivers; no network event subscription is required.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::browser::{BrowserEngine, PageId};
use crate::dom::scripts::BODY_LENGTH_SCRIPT;

/// Stability polling parameters, in milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessConfig {
    /// Hard ceiling on the whole wait
    pub stability_timeout_ms: u64,
    /// Idle window the content length must hold for
    pub network_idle_timeout_ms: u64,
    /// Sampling interval
    pub poll_interval_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            stability_timeout_ms: 5000,
            network_idle_timeout_ms: 500,
            poll_interval_ms: 100,
        }
    }
}

/// Wait until the page content holds still for one idle window, or until
/// the stability timeout elapses. Never fails; a noisy page simply runs the
/// clock out.
pub async fn wait_for_ready(engine: &dyn BrowserEngine, page: PageId, config: &ReadinessConfig) {
    let started = Instant::now();
    let stability_timeout = Duration::from_millis(config.stability_timeout_ms);
    let idle_window = Duration::from_millis(config.network_idle_timeout_ms);
    let poll_interval = Duration::from_millis(config.poll_interval_ms);

    let mut last_length: Option<u64> = None;
    let mut stable_since: Option<Instant> = None;

    loop {
        if started.elapsed() >= stability_timeout {
            debug!("Readiness wait hit stability timeout");
            return;
        }

        let length = match engine.evaluate(page, BODY_LENGTH_SCRIPT).await {
            Ok(value) => value.as_u64().unwrap_or(0),
            Err(e) => {
                debug!("Readiness poll failed, retrying: {e}");
                tokio::time::sleep(poll_interval).await;
                continue;
            }
        };

        match last_length {
            Some(previous) if previous == length => match stable_since {
                Some(since) if since.elapsed() >= idle_window => return,
                Some(_) => {}
                None => stable_since = Some(Instant::now()),
            },
            _ => stable_since = None,
        }
        last_length = Some(length);

        tokio::time::sleep(poll_interval).await;
    }
}

/// Result of running an action that may have routed a single-page app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaNavigation {
    pub navigated: bool,
    pub new_url: String,
}

/// Run `action`, wait for readiness, and report whether the page URL moved.
///
/// Catches client-side routing that never triggers a document navigation.
pub async fn detect_spa_navigation<F, Fut>(
    engine: &dyn BrowserEngine,
    page: PageId,
    config: &ReadinessConfig,
    action: F,
) -> Result<SpaNavigation>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let before = engine.current_url(page).await?;
    action().await?;
    wait_for_ready(engine, page, config).await;
    let after = engine.current_url(page).await?;
    Ok(SpaNavigation {
        navigated: before != after,
        new_url: after,
    })
}
