//! Typestate builder for `ExplorationConfig`.
//!
//! The start URL is the only required field; the type parameter tracks
//! whether it has been supplied so `build()` only exists on a complete
//! builder.

use std::marker::PhantomData;

use crate::explore::coverage::CoverageThresholds;
use crate::explore::cycles::CycleConfig;
use crate::explore::readiness::ReadinessConfig;
use crate::explore::scope::ScopeConfig;

use super::types::{ExplorationConfig, ExplorationStrategy};

pub struct WithStartUrl;

pub struct ExplorationConfigBuilder<State = ()> {
    start_url: Option<String>,
    max_pages: usize,
    timeout_ms: u64,
    strategy: ExplorationStrategy,
    scope: ScopeConfig,
    cycles: CycleConfig,
    spa: ReadinessConfig,
    coverage_thresholds: Option<CoverageThresholds>,
    navigation_timeout_secs: u64,
    _phantom: PhantomData<State>,
}

impl Default for ExplorationConfigBuilder<()> {
    fn default() -> Self {
        Self {
            start_url: None,
            max_pages: 50,
            timeout_ms: 300_000,
            strategy: ExplorationStrategy::BreadthFirst,
            scope: ScopeConfig::default(),
            cycles: CycleConfig::default(),
            spa: ReadinessConfig::default(),
            coverage_thresholds: None,
            navigation_timeout_secs: 30,
            _phantom: PhantomData,
        }
    }
}

impl ExplorationConfigBuilder<()> {
    #[must_use]
    pub fn start_url(self, url: impl Into<String>) -> ExplorationConfigBuilder<WithStartUrl> {
        ExplorationConfigBuilder {
            start_url: Some(url.into()),
            max_pages: self.max_pages,
            timeout_ms: self.timeout_ms,
            strategy: self.strategy,
            scope: self.scope,
            cycles: self.cycles,
            spa: self.spa,
            coverage_thresholds: self.coverage_thresholds,
            navigation_timeout_secs: self.navigation_timeout_secs,
            _phantom: PhantomData,
        }
    }
}

impl<State> ExplorationConfigBuilder<State> {
    #[must_use]
    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    #[must_use]
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    #[must_use]
    pub fn strategy(mut self, strategy: ExplorationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn scope(mut self, scope: ScopeConfig) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn cycles(mut self, cycles: CycleConfig) -> Self {
        self.cycles = cycles;
        self
    }

    #[must_use]
    pub fn spa(mut self, spa: ReadinessConfig) -> Self {
        self.spa = spa;
        self
    }

    #[must_use]
    pub fn coverage_thresholds(mut self, thresholds: CoverageThresholds) -> Self {
        self.coverage_thresholds = Some(thresholds);
        self
    }

    #[must_use]
    pub fn navigation_timeout_secs(mut self, secs: u64) -> Self {
        self.navigation_timeout_secs = secs;
        self
    }
}

impl ExplorationConfigBuilder<WithStartUrl> {
    #[must_use]
    pub fn build(self) -> ExplorationConfig {
        ExplorationConfig {
            start_url: self.start_url.unwrap_or_default(),
            max_pages: self.max_pages,
            timeout_ms: self.timeout_ms,
            strategy: self.strategy,
            scope: self.scope,
            cycles: self.cycles,
            spa: self.spa,
            coverage_thresholds: self.coverage_thresholds,
            navigation_timeout_secs: self.navigation_timeout_secs,
        }
    }
}
