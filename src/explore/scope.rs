//! Exploration scope enforcement.
//!
//! Every candidate URL is judged independently of reachability: host rules
//! first, then query stripping, then deny patterns (which beat allow
//! patterns), then the allow list. Invalid regexes are logged and skipped at
//! evaluation time; `validate_scope_config` reports them up front.

use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Scope rules as configured by the caller. Patterns are regular
/// expressions matched against the whole URL string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeConfig {
    #[serde(default)]
    pub allow_patterns: Vec<String>,
    #[serde(default)]
    pub deny_patterns: Vec<String>,
    #[serde(default)]
    pub allow_external_domains: bool,
    /// Patterns matched against query keys; matching keys are removed from
    /// the URL before deny/allow evaluation.
    #[serde(default)]
    pub exclude_query_patterns: Vec<String>,
}

/// Outcome of a scope check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ScopeDecision {
    Allowed,
    Denied { reason: String },
}

impl ScopeDecision {
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    fn denied(reason: impl Into<String>) -> Self {
        Self::Denied {
            reason: reason.into(),
        }
    }
}

/// Pre-compiled scope filter anchored to the exploration's base host.
pub struct ScopeFilter {
    base_host: String,
    allow: Vec<Regex>,
    deny: Vec<Regex>,
    exclude_query: Vec<Regex>,
    allow_external: bool,
}

fn compile_patterns(patterns: &[String], kind: &str) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!("Skipping invalid {kind} pattern {pattern:?}: {e}");
                None
            }
        })
        .collect()
}

impl ScopeFilter {
    /// Build a filter for `base_url`. Invalid patterns are dropped with a
    /// warning; an unparseable base URL leaves the host check matching
    /// nothing external.
    #[must_use]
    pub fn new(base_url: &str, config: &ScopeConfig) -> Self {
        let base_host = Url::parse(base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
            .unwrap_or_default();
        Self {
            base_host,
            allow: compile_patterns(&config.allow_patterns, "allow"),
            deny: compile_patterns(&config.deny_patterns, "deny"),
            exclude_query: compile_patterns(&config.exclude_query_patterns, "exclude-query"),
            allow_external: config.allow_external_domains,
        }
    }

    /// Decide whether `candidate` is in scope.
    #[must_use]
    pub fn evaluate(&self, candidate: &str) -> ScopeDecision {
        let Ok(parsed) = Url::parse(candidate) else {
            return ScopeDecision::denied("Invalid URL");
        };

        if !self.allow_external {
            let host = parsed.host_str().map(str::to_lowercase).unwrap_or_default();
            if host != self.base_host {
                return ScopeDecision::denied(format!(
                    "External domain {host:?} is out of scope"
                ));
            }
        }

        let stripped = self.strip_excluded_query(parsed);
        let subject = stripped.as_str();

        for deny in &self.deny {
            if deny.is_match(subject) {
                return ScopeDecision::denied(format!(
                    "Matched deny pattern {:?}",
                    deny.as_str()
                ));
            }
        }

        if self.allow.is_empty() {
            return ScopeDecision::Allowed;
        }
        if self.allow.iter().any(|allow| allow.is_match(subject)) {
            ScopeDecision::Allowed
        } else {
            ScopeDecision::denied("No allow pattern matched")
        }
    }

    fn strip_excluded_query(&self, mut url: Url) -> Url {
        if self.exclude_query.is_empty() || url.query().is_none() {
            return url;
        }
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !self.exclude_query.iter().any(|p| p.is_match(key)))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(&kept);
        }
        url
    }
}

/// Pre-compile every pattern in `config` and return the invalid ones.
#[must_use]
pub fn validate_scope_config(config: &ScopeConfig) -> Vec<String> {
    config
        .allow_patterns
        .iter()
        .chain(&config.deny_patterns)
        .chain(&config.exclude_query_patterns)
        .filter(|pattern| Regex::new(pattern).is_err())
        .cloned()
        .collect()
}
