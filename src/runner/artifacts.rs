//! Failure artifact capture.
//!
//! Each test owns `outputDir/<suite>/<testId>/`; a failing test gets a
//! screenshot there and, when console errors were collected, a log file.
//! Capture failures degrade to partial artifacts, never to test failures.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::warn;

use crate::browser::{BrowserEngine, PageId};

use super::results::TestArtifacts;

const SCREENSHOT_FILENAME: &str = "failure-screenshot.png";
const CONSOLE_LOG_FILENAME: &str = "console.log";

/// Replace every character outside `[a-zA-Z0-9_-]` with `-`.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Writes per-test artifacts under a fixed output root.
#[derive(Debug, Clone)]
pub struct ArtifactCollector {
    output_dir: PathBuf,
}

impl ArtifactCollector {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Ensure `outputDir/<suite>/<testId>/` exists and return it.
    pub async fn create_artifact_dir(&self, suite: &str, test_id: &str) -> Result<PathBuf> {
        let dir = self.output_dir.join(suite).join(test_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create artifact directory {}", dir.display()))?;
        Ok(dir)
    }

    /// Capture a screenshot into `dir`.
    pub async fn capture_screenshot(
        &self,
        engine: &dyn BrowserEngine,
        page: PageId,
        dir: &Path,
    ) -> Result<PathBuf> {
        let bytes = engine
            .screenshot(page)
            .await
            .context("Screenshot capture failed")?;
        let path = dir.join(SCREENSHOT_FILENAME);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write screenshot to {}", path.display()))?;
        Ok(path)
    }

    /// Write collected console errors into `dir`, or nothing when the list
    /// is empty.
    pub async fn capture_console_logs(
        &self,
        dir: &Path,
        errors: &[String],
    ) -> Result<Option<PathBuf>> {
        if errors.is_empty() {
            return Ok(None);
        }
        let path = dir.join(CONSOLE_LOG_FILENAME);
        tokio::fs::write(&path, errors.join("\n"))
            .await
            .with_context(|| format!("Failed to write console log to {}", path.display()))?;
        Ok(Some(path))
    }

    /// Best-effort capture of everything for one failed test.
    pub async fn collect(
        &self,
        engine: &dyn BrowserEngine,
        page: PageId,
        suite: &str,
        test_id: &str,
        console_errors: &[String],
    ) -> TestArtifacts {
        let dir = match self.create_artifact_dir(suite, test_id).await {
            Ok(dir) => dir,
            Err(e) => {
                warn!("Artifact directory creation failed for {suite}/{test_id}: {e}");
                return TestArtifacts::default();
            }
        };

        let screenshot_path = match self.capture_screenshot(engine, page, &dir).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Screenshot capture failed for {suite}/{test_id}: {e}");
                None
            }
        };
        let log_path = match self.capture_console_logs(&dir, console_errors).await {
            Ok(path) => path,
            Err(e) => {
                warn!("Console log capture failed for {suite}/{test_id}: {e}");
                None
            }
        };

        TestArtifacts {
            screenshot_path,
            log_path,
            artifact_dir: Some(dir),
        }
    }
}
