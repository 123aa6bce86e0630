//! Revisit-budget enforcement.
//!
//! A fingerprint already in the visited set is a duplicate state; a
//! normalized URL whose visit counter has reached the configured limit is a
//! parameterized-URL cycle. Infinite scroll is surfaced separately by
//! [`ScrollTracker`] when a revisited URL keeps growing its DOM.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::state::StateFingerprint;

/// Why a URL was cut off from further exploration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CycleReason {
    DuplicateState,
    ParameterizedUrlLimit,
    InfiniteScroll,
}

/// One detected cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleEntry {
    pub url: String,
    pub reason: CycleReason,
    pub count: u32,
}

/// All cycles detected during one exploration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub entries: Vec<CycleEntry>,
    pub total_cycles: u32,
}

impl CycleReport {
    #[must_use]
    pub fn from_entries(entries: Vec<CycleEntry>) -> Self {
        let total_cycles = u32::try_from(entries.len()).unwrap_or(u32::MAX);
        Self {
            entries,
            total_cycles,
        }
    }
}

/// Revisit budgets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleConfig {
    /// Visits allowed per normalized URL before it is treated as a
    /// parameterized trap
    pub parameterized_url_limit: u32,
    /// Consecutive DOM-growth observations on a revisited URL before it is
    /// treated as infinite scroll
    pub infinite_scroll_threshold: u32,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            parameterized_url_limit: 5,
            infinite_scroll_threshold: 3,
        }
    }
}

/// Check a fingerprint against the visited set and the per-URL counter.
///
/// Returns `None` when the page is fresh and may be explored.
#[must_use]
pub fn check_cycle(
    fingerprint: &StateFingerprint,
    visited: &HashSet<String>,
    url_counts: &HashMap<String, u32>,
    config: &CycleConfig,
) -> Option<CycleEntry> {
    if visited.contains(&fingerprint.key()) {
        return Some(CycleEntry {
            url: fingerprint.normalized_url.clone(),
            reason: CycleReason::DuplicateState,
            count: 1,
        });
    }

    let counter = url_counts
        .get(&fingerprint.normalized_url)
        .copied()
        .unwrap_or(0);
    if counter >= config.parameterized_url_limit {
        return Some(CycleEntry {
            url: fingerprint.normalized_url.clone(),
            reason: CycleReason::ParameterizedUrlLimit,
            count: counter + 1,
        });
    }

    None
}

/// Tracks DOM sizes per normalized URL to surface infinite-scroll traps.
///
/// A same-URL revisit whose DOM is strictly larger than the previous
/// observation extends a growth streak; once the streak reaches the
/// threshold an entry is emitted and the streak resets.
#[derive(Debug, Default)]
pub struct ScrollTracker {
    observed: HashMap<String, (usize, u32)>,
}

impl ScrollTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(
        &mut self,
        normalized_url: &str,
        dom_size: usize,
        config: &CycleConfig,
    ) -> Option<CycleEntry> {
        let (last_size, streak) = self
            .observed
            .get(normalized_url)
            .copied()
            .unwrap_or((0, 0));

        let streak = if last_size > 0 && dom_size > last_size {
            streak + 1
        } else {
            0
        };
        self.observed
            .insert(normalized_url.to_string(), (dom_size, streak));

        if streak >= config.infinite_scroll_threshold {
            self.observed
                .insert(normalized_url.to_string(), (dom_size, 0));
            return Some(CycleEntry {
                url: normalized_url.to_string(),
                reason: CycleReason::InfiniteScroll,
                count: streak,
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fingerprint(url: &str, hash: &str) -> StateFingerprint {
        StateFingerprint {
            normalized_url: url.to_string(),
            dom_hash: hash.to_string(),
        }
    }

    #[test]
    fn known_fingerprint_is_a_duplicate_state() {
        let fp = fingerprint("https://a.com/p", "h1");
        let mut visited = HashSet::new();
        visited.insert(fp.key());
        let entry = check_cycle(&fp, &visited, &HashMap::new(), &CycleConfig::default())
            .expect("cycle expected");
        assert_eq!(entry.reason, CycleReason::DuplicateState);
        assert_eq!(entry.count, 1);
    }

    #[test]
    fn url_limit_fires_exactly_at_the_limit() {
        let config = CycleConfig {
            parameterized_url_limit: 3,
            ..CycleConfig::default()
        };
        let visited = HashSet::new();
        let mut counts = HashMap::new();

        counts.insert("https://a.com/p".to_string(), 2);
        let fp = fingerprint("https://a.com/p", "h-next");
        assert!(check_cycle(&fp, &visited, &counts, &config).is_none());

        counts.insert("https://a.com/p".to_string(), 3);
        let entry = check_cycle(&fp, &visited, &counts, &config).expect("cycle expected");
        assert_eq!(entry.reason, CycleReason::ParameterizedUrlLimit);
        assert_eq!(entry.count, 4);
    }

    #[test]
    fn scroll_tracker_needs_consecutive_growth() {
        let config = CycleConfig {
            infinite_scroll_threshold: 2,
            ..CycleConfig::default()
        };
        let mut tracker = ScrollTracker::new();
        assert!(tracker.observe("u", 100, &config).is_none());
        assert!(tracker.observe("u", 200, &config).is_none());
        let entry = tracker.observe("u", 300, &config).expect("cycle expected");
        assert_eq!(entry.reason, CycleReason::InfiniteScroll);

        // Shrinking resets the streak.
        assert!(tracker.observe("u", 250, &config).is_none());
        assert!(tracker.observe("u", 260, &config).is_none());
    }

    #[test]
    fn report_counts_entries() {
        let report = CycleReport::from_entries(vec![
            CycleEntry {
                url: "u".to_string(),
                reason: CycleReason::DuplicateState,
                count: 1,
            };
            3
        ]);
        assert_eq!(report.total_cycles, 3);
    }
}
