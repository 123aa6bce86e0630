//! Sentinel: autonomous web QA.
//!
//! Two engines share a browser-driver abstraction and a DOM fingerprinting
//! substrate: the discovery engine crawls an application into a navigation
//! graph with coverage metrics and user journeys, and the execution engine
//! runs generated test cases across a pool of isolated browser workers
//! with retries, crash recovery, and failure artifacts.

pub mod browser;
pub mod config;
pub mod dom;
pub mod error;
pub mod explore;
pub mod model;
pub mod runner;

pub use browser::{
    BrowserEngine, BrowserError, BrowserResult, BrowserType, ChromiumEngine, ContextId,
    LaunchOptions, NavigateOptions, NetworkResponse, PageId,
};
pub use config::{ExplorationConfig, ExplorationStrategy, RunnerConfig};
pub use dom::{BoundingBox, DomNode, RawAccessibilityNode, RawDomData, hash_dom};
pub use error::RunnerError;
pub use explore::{
    ActionType, AppEdge, AppGraph, AppNode, CoverageMetrics, CycleReport, ExplorationResult,
    ExplorationState, Explorer, JourneyType, NoOpProgress, ScopeConfig, ScopeFilter,
    StateFingerprint, UserJourney, normalize_url,
};
pub use model::{TestAssertion, TestCase, TestStep, TestSuite};
pub use runner::{RunResult, RunSummary, Scheduler, TestResult, TestStatus, run_suites};
