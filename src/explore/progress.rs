//! Progress reporting for the exploration loop.
//!
//! Implementations can forward updates to channels, log to console, or
//! update a UI. The abstraction keeps the loop independent of any
//! particular consumer.

use serde::{Deserialize, Serialize};

/// Per-iteration progress snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    /// Visited pages plus frontier entries
    pub pages_discovered: usize,
    pub pages_visited: usize,
    pub pages_remaining: usize,
    pub elements_activated: usize,
    pub elapsed_ms: u64,
}

/// Observer of exploration lifecycle events.
pub trait ExplorationProgress: Send + Sync {
    /// The loop is about to start crawling from `start_url`.
    fn report_started(&self, start_url: &str);

    /// A page iteration finished.
    fn report_progress(&self, update: &ProgressUpdate);

    /// The loop finished and the graph is complete.
    fn report_completed(&self);
}

/// Progress observer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgress;

impl ExplorationProgress for NoOpProgress {
    #[inline(always)]
    fn report_started(&self, _start_url: &str) {}

    #[inline(always)]
    fn report_progress(&self, _update: &ProgressUpdate) {}

    #[inline(always)]
    fn report_completed(&self) {}
}
