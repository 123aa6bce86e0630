//! Engine configuration types.
//!
//! `ExplorationConfig` drives the discovery engine; `RunnerConfig` drives
//! the execution engine. Both serialize so that runs can be reproduced and
//! so the runner config can cross the worker IPC boundary.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::browser::BrowserType;
use crate::error::RunnerError;
use crate::explore::coverage::CoverageThresholds;
use crate::explore::cycles::CycleConfig;
use crate::explore::readiness::ReadinessConfig;
use crate::explore::scope::ScopeConfig;

/// Frontier ordering for the exploration loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExplorationStrategy {
    BreadthFirst,
    DepthFirst,
}

impl Default for ExplorationStrategy {
    fn default() -> Self {
        Self::BreadthFirst
    }
}

/// Configuration for one exploration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorationConfig {
    pub start_url: String,
    /// Hard ceiling on discovered graph nodes
    pub max_pages: usize,
    /// Wall-clock budget for the whole crawl
    pub timeout_ms: u64,
    #[serde(default)]
    pub strategy: ExplorationStrategy,
    #[serde(default)]
    pub scope: ScopeConfig,
    #[serde(default)]
    pub cycles: CycleConfig,
    /// SPA readiness polling; defaults suit most applications
    #[serde(default)]
    pub spa: ReadinessConfig,
    /// When set, the crawl stops early once every axis is satisfied
    #[serde(default)]
    pub coverage_thresholds: Option<CoverageThresholds>,
    /// Per-navigation deadline
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,
}

const fn default_navigation_timeout_secs() -> u64 {
    30
}

impl ExplorationConfig {
    /// Builder anchored to a start URL.
    #[must_use]
    pub fn builder() -> super::builder::ExplorationConfigBuilder {
        super::builder::ExplorationConfigBuilder::default()
    }
}

/// Configuration for one execution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerConfig {
    /// Size of the worker pool
    pub workers: usize,
    /// Failed attempts allowed per test beyond the first
    pub retries: u32,
    /// Driver-level navigation deadline per operation
    pub timeout_ms: u64,
    #[serde(default)]
    pub browser: BrowserType,
    pub headless: bool,
    /// Navigated to before each test when set
    #[serde(default)]
    pub base_url: Option<String>,
    /// Root of per-test artifact directories and reports
    pub output_dir: PathBuf,
    /// Worker executable override; defaults to `sentinel-worker` next to
    /// the current executable
    #[serde(default)]
    pub worker_binary: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            retries: 2,
            timeout_ms: 30_000,
            browser: BrowserType::Chromium,
            headless: true,
            base_url: None,
            output_dir: PathBuf::from("sentinel-output"),
            worker_binary: None,
        }
    }
}

impl RunnerConfig {
    /// Pre-flight validation; the scheduler refuses to spawn anything when
    /// this fails.
    pub fn validate(&self) -> Result<(), RunnerError> {
        if self.workers == 0 {
            return Err(RunnerError::InvalidConfig(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(RunnerError::InvalidConfig(
                "timeout must be positive".to_string(),
            ));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(RunnerError::InvalidConfig(
                "output directory must be set".to_string(),
            ));
        }
        if let Some(base) = &self.base_url
            && url::Url::parse(base).is_err()
        {
            return Err(RunnerError::InvalidConfig(format!(
                "base URL {base:?} does not parse"
            )));
        }
        Ok(())
    }
}
