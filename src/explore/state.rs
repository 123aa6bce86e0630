//! Page-state tracking, fingerprints, and resumable exploration state.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::graph::AppGraph;

/// A captured page state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageState {
    /// Monotonically increasing within one tracker instance
    pub id: u64,
    pub url: String,
    pub dom_hash: String,
    pub modal_indicators: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Identity of a page state: normalized URL plus content hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateFingerprint {
    pub normalized_url: String,
    pub dom_hash: String,
}

impl StateFingerprint {
    /// Visited-set key: `"<normalizedUrl>|<domHash>"`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}|{}", self.normalized_url, self.dom_hash)
    }
}

/// Issues page states with monotonically increasing ids.
#[derive(Debug, Default)]
pub struct StateTracker {
    next_id: u64,
}

impl StateTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture(
        &mut self,
        url: &str,
        dom_hash: &str,
        modal_indicators: Vec<String>,
    ) -> PageState {
        self.next_id += 1;
        PageState {
            id: self.next_id,
            url: url.to_string(),
            dom_hash: dom_hash.to_string(),
            modal_indicators,
            timestamp: Utc::now(),
        }
    }
}

/// Everything needed to pause an exploration and pick it back up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorationState {
    pub queue: Vec<String>,
    pub visited_fingerprints: Vec<String>,
    pub graph: AppGraph,
    pub activated_element_ids: Vec<String>,
    pub total_elements_found: usize,
    /// Epoch milliseconds of the original start
    pub started_at: i64,
}

impl ExplorationState {
    pub fn serialize(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn deserialize(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }
}

/// Persist a checkpoint to disk.
pub async fn save_state(state: &ExplorationState, path: &Path) -> Result<()> {
    let json = state.serialize()?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write exploration state to {}", path.display()))
}

/// Load a checkpoint from disk.
pub async fn load_state(path: &Path) -> Result<ExplorationState> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read exploration state from {}", path.display()))?;
    ExplorationState::deserialize(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_ids_increase() {
        let mut tracker = StateTracker::new();
        let a = tracker.capture("https://a.com/", "h1", Vec::new());
        let b = tracker.capture("https://a.com/x", "h2", Vec::new());
        assert!(b.id > a.id);
    }

    #[test]
    fn fingerprint_key_format() {
        let fp = StateFingerprint {
            normalized_url: "https://a.com/p".to_string(),
            dom_hash: "abc".to_string(),
        };
        assert_eq!(fp.key(), "https://a.com/p|abc");
    }

    #[test]
    fn exploration_state_round_trips() {
        let state = ExplorationState {
            queue: vec!["https://a.com/next".to_string()],
            visited_fingerprints: vec!["https://a.com/|h".to_string()],
            graph: AppGraph::new("https://a.com/"),
            activated_element_ids: vec!["#nav".to_string()],
            total_elements_found: 12,
            started_at: 1_722_470_400_000,
        };
        let json = state.serialize().unwrap();
        let back = ExplorationState::deserialize(&json).unwrap();
        assert_eq!(back.queue, state.queue);
        assert_eq!(back.visited_fingerprints, state.visited_fingerprints);
        assert_eq!(back.total_elements_found, 12);
        assert_eq!(back.started_at, state.started_at);
    }
}
