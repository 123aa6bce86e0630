//! Discovery engine.
//!
//! A bounded exploration loop drives a single browser page through a URL
//! frontier, fingerprinting each page state, enforcing scope and revisit
//! budgets, and emitting a navigation graph with coverage metrics, a cycle
//! report, and identified user journeys.

pub mod coverage;
pub mod cycles;
pub mod explorer;
pub mod graph;
pub mod journeys;
pub mod normalizer;
pub mod progress;
pub mod readiness;
pub mod scope;
pub mod state;

pub use coverage::{
    CoverageMetrics, CoverageRatio, CoverageThresholds, ThresholdCheck, calculate_coverage,
    check_thresholds,
};
pub use cycles::{CycleConfig, CycleEntry, CycleReason, CycleReport, check_cycle};
pub use explorer::{ExplorationResult, Explorer};
pub use graph::{ActionType, AppEdge, AppGraph, AppNode};
pub use journeys::{JourneyType, UserJourney, classify_steps, identify_journeys};
pub use normalizer::normalize_url;
pub use progress::{ExplorationProgress, NoOpProgress, ProgressUpdate};
pub use readiness::{ReadinessConfig, SpaNavigation, detect_spa_navigation, wait_for_ready};
pub use scope::{ScopeConfig, ScopeDecision, ScopeFilter, validate_scope_config};
pub use state::{ExplorationState, PageState, StateFingerprint, StateTracker};
