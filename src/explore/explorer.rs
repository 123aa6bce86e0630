//! The bounded exploration loop.
//!
//! Composes normalization, readiness, hashing, cycle detection, scope
//! enforcement, the graph store, and coverage into a single-owner crawl
//! over one browser page. All loop state lives here; suspension points are
//! exactly the driver calls.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, info, warn};
use url::Url;

use crate::browser::{BrowserEngine, NavigateOptions, PageId};
use crate::config::{ExplorationConfig, ExplorationStrategy};
use crate::dom::scripts::TITLE_SCRIPT;
use crate::dom::{
    ElementCategory, classify_interactive_elements, detect_forms, detect_modal_indicators,
    extract_dom, hash_dom,
};

use super::coverage::{CoverageMetrics, calculate_coverage, check_thresholds};
use super::cycles::{CycleEntry, CycleReport, ScrollTracker, check_cycle};
use super::graph::{ActionType, AppEdge, AppGraph, AppNode};
use super::journeys::{UserJourney, identify_journeys};
use super::normalizer::normalize_url;
use super::progress::{ExplorationProgress, ProgressUpdate};
use super::readiness::wait_for_ready;
use super::scope::ScopeFilter;
use super::state::{ExplorationState, StateFingerprint, StateTracker};

/// Output of one exploration run.
#[derive(Debug, Clone)]
pub struct ExplorationResult {
    pub graph: AppGraph,
    pub coverage: CoverageMetrics,
    pub journeys: Vec<UserJourney>,
    pub cycle_report: CycleReport,
}

/// A navigation edge waiting for its target node to be discovered.
#[derive(Debug, Clone)]
struct PendingEdge {
    source_id: String,
    selector: String,
}

/// Single-owner exploration over one browser page.
pub struct Explorer<'e> {
    engine: &'e dyn BrowserEngine,
    page: PageId,
    config: ExplorationConfig,
    scope: ScopeFilter,

    graph: AppGraph,
    visited: HashSet<String>,
    url_counts: HashMap<String, u32>,
    frontier: VecDeque<String>,
    cycle_entries: Vec<CycleEntry>,
    activated_elements: HashSet<String>,
    total_elements_found: usize,
    edges_traversed: usize,
    /// Edges buffered until their target node exists, keyed by the
    /// normalized target URL
    pending_edges: HashMap<String, Vec<PendingEdge>>,
    node_by_url: HashMap<String, String>,
    tracker: StateTracker,
    scroll: ScrollTracker,
    started_at_ms: i64,
    next_node: usize,
}

impl<'e> Explorer<'e> {
    /// Fresh exploration seeded with the configured start URL.
    pub fn new(
        engine: &'e dyn BrowserEngine,
        page: PageId,
        config: ExplorationConfig,
    ) -> Result<Self> {
        Url::parse(&config.start_url)
            .with_context(|| format!("Start URL {:?} does not parse", config.start_url))?;
        let scope = ScopeFilter::new(&config.start_url, &config.scope);
        let mut frontier = VecDeque::new();
        frontier.push_back(config.start_url.clone());
        let graph = AppGraph::new(&config.start_url);
        Ok(Self {
            engine,
            page,
            config,
            scope,
            graph,
            visited: HashSet::new(),
            url_counts: HashMap::new(),
            frontier,
            cycle_entries: Vec::new(),
            activated_elements: HashSet::new(),
            total_elements_found: 0,
            edges_traversed: 0,
            pending_edges: HashMap::new(),
            node_by_url: HashMap::new(),
            tracker: StateTracker::new(),
            scroll: ScrollTracker::new(),
            started_at_ms: Utc::now().timestamp_millis(),
            next_node: 1,
        })
    }

    /// Resume from a serialized checkpoint. Visit counters and the
    /// URL-to-node index are rebuilt from the persisted fingerprints and
    /// graph.
    pub fn resume(
        engine: &'e dyn BrowserEngine,
        page: PageId,
        config: ExplorationConfig,
        state: ExplorationState,
    ) -> Result<Self> {
        let mut explorer = Self::new(engine, page, config)?;
        explorer.frontier = state.queue.into();
        explorer.visited = state.visited_fingerprints.iter().cloned().collect();
        for key in &state.visited_fingerprints {
            if let Some((url, _)) = key.split_once('|') {
                *explorer.url_counts.entry(url.to_string()).or_insert(0) += 1;
            }
        }
        for node in state.graph.nodes() {
            explorer
                .node_by_url
                .insert(normalize_url(&node.url), node.id.clone());
        }
        explorer.next_node = state.graph.nodes().len() + 1;
        explorer.edges_traversed = state.graph.edges().len();
        explorer.graph = state.graph;
        explorer.activated_elements = state.activated_element_ids.into_iter().collect();
        explorer.total_elements_found = state.total_elements_found;
        explorer.started_at_ms = state.started_at;
        Ok(explorer)
    }

    /// Serializable snapshot of the loop state.
    #[must_use]
    pub fn checkpoint(&self) -> ExplorationState {
        let mut visited_fingerprints: Vec<String> = self.visited.iter().cloned().collect();
        visited_fingerprints.sort();
        let mut activated_element_ids: Vec<String> =
            self.activated_elements.iter().cloned().collect();
        activated_element_ids.sort();
        ExplorationState {
            queue: self.frontier.iter().cloned().collect(),
            visited_fingerprints,
            graph: self.graph.clone(),
            activated_element_ids,
            total_elements_found: self.total_elements_found,
            started_at: self.started_at_ms,
        }
    }

    fn coverage(&self) -> CoverageMetrics {
        let visited = self.graph.nodes().len();
        let pending: usize = self.pending_edges.values().map(Vec::len).sum();
        calculate_coverage(
            visited,
            visited + self.frontier.len(),
            self.activated_elements.len(),
            self.total_elements_found,
            self.edges_traversed,
            self.graph.edges().len() + pending,
        )
    }

    /// Run the crawl to completion.
    pub async fn run(
        &mut self,
        progress: &dyn ExplorationProgress,
    ) -> Result<ExplorationResult> {
        let started = Instant::now();
        progress.report_started(&self.config.start_url);
        info!("Exploration started at {}", self.config.start_url);

        loop {
            if self.graph.nodes().len() >= self.config.max_pages {
                info!("Reached page limit of {}", self.config.max_pages);
                break;
            }
            if started.elapsed() >= Duration::from_millis(self.config.timeout_ms) {
                info!("Exploration timed out after {}ms", self.config.timeout_ms);
                break;
            }
            let candidate = match self.config.strategy {
                ExplorationStrategy::BreadthFirst => self.frontier.pop_front(),
                ExplorationStrategy::DepthFirst => self.frontier.pop_back(),
            };
            let Some(candidate) = candidate else {
                info!("Frontier exhausted");
                break;
            };

            self.visit(&candidate).await;

            let update = ProgressUpdate {
                pages_discovered: self.graph.nodes().len() + self.frontier.len(),
                pages_visited: self.graph.nodes().len(),
                pages_remaining: self.frontier.len(),
                elements_activated: self.activated_elements.len(),
                elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            };
            progress.report_progress(&update);

            if let Some(thresholds) = &self.config.coverage_thresholds
                && check_thresholds(&self.coverage(), thresholds).met
            {
                info!("Coverage thresholds met, stopping early");
                break;
            }
        }

        self.graph.complete();
        let coverage = self.coverage();
        let journeys = identify_journeys(&self.graph);
        let cycle_report = CycleReport::from_entries(self.cycle_entries.clone());
        progress.report_completed();
        info!(
            "Exploration complete: {} pages, {} edges, {} journeys, {} cycles",
            self.graph.nodes().len(),
            self.graph.edges().len(),
            journeys.len(),
            cycle_report.total_cycles
        );

        Ok(ExplorationResult {
            graph: self.graph.clone(),
            coverage,
            journeys,
            cycle_report,
        })
    }

    /// One frontier iteration. Failures are iteration-local: the URL is
    /// skipped and the loop continues.
    async fn visit(&mut self, candidate: &str) {
        let decision = self.scope.evaluate(candidate);
        if !decision.is_allowed() {
            debug!("Out of scope, skipping {candidate}: {decision:?}");
            return;
        }

        let navigate_opts = NavigateOptions {
            timeout: Some(Duration::from_secs(self.config.navigation_timeout_secs)),
        };
        let http_status = match self.engine.navigate(self.page, candidate, navigate_opts).await {
            Ok(status) => status,
            Err(e) => {
                warn!("Navigation failed for {candidate}: {e}");
                return;
            }
        };

        wait_for_ready(self.engine, self.page, &self.config.spa).await;

        // The engine URL may differ from the requested one after redirects
        // or SPA routing.
        let current_url = match self.engine.current_url(self.page).await {
            Ok(url) => url,
            Err(e) => {
                warn!("Could not read current URL after {candidate}: {e}");
                return;
            }
        };

        let dom = match extract_dom(self.engine, self.page).await {
            Ok(dom) => dom,
            Err(e) => {
                warn!("DOM extraction failed for {current_url}: {e}");
                return;
            }
        };

        let dom_hash = hash_dom(&dom);
        let normalized = normalize_url(&current_url);
        let fingerprint = StateFingerprint {
            normalized_url: normalized.clone(),
            dom_hash: dom_hash.clone(),
        };

        let page_state =
            self.tracker
                .capture(&current_url, &dom_hash, detect_modal_indicators(&dom));
        if !page_state.modal_indicators.is_empty() {
            debug!(
                "Page state {} has open modal layers: {:?}",
                page_state.id, page_state.modal_indicators
            );
        }

        let mut dom_size = 0usize;
        dom.walk(&mut |_| dom_size += 1);
        if let Some(entry) = self.scroll.observe(&normalized, dom_size, &self.config.cycles) {
            debug!("Infinite scroll suspected at {normalized}");
            self.cycle_entries.push(entry);
            return;
        }

        if let Some(entry) = check_cycle(
            &fingerprint,
            &self.visited,
            &self.url_counts,
            &self.config.cycles,
        ) {
            debug!("Cycle at {normalized}: {:?}", entry.reason);
            self.cycle_entries.push(entry);
            return;
        }

        self.visited.insert(fingerprint.key());
        *self.url_counts.entry(normalized.clone()).or_insert(0) += 1;

        let elements = classify_interactive_elements(&dom);
        let forms = detect_forms(&dom);
        if !forms.is_empty() {
            debug!("Detected {} forms on {current_url}", forms.len());
        }
        self.total_elements_found += elements.len();

        let title = self
            .engine
            .evaluate(self.page, TITLE_SCRIPT)
            .await
            .ok()
            .and_then(|value| value.as_str().map(ToString::to_string))
            .unwrap_or_default();

        let node_id = format!("node-{}", self.next_node);
        self.next_node += 1;
        let node = AppNode {
            id: node_id.clone(),
            url: current_url.clone(),
            title,
            element_count: elements.len(),
            discovery_timestamp: Utc::now(),
            dom_hash,
            screenshot_path: None,
        };
        if let Err(e) = self.graph.add_node(node) {
            warn!("Failed to record node for {current_url}: {e}");
            return;
        }
        self.node_by_url.insert(normalized.clone(), node_id.clone());

        // Edges queued while this page was only a link target can be
        // attached now that the node exists.
        if let Some(pending) = self.pending_edges.remove(&normalized) {
            for edge in pending {
                let resolved = AppEdge {
                    source_id: edge.source_id,
                    target_id: node_id.clone(),
                    action_type: ActionType::Navigation,
                    selector: edge.selector,
                    http_status,
                };
                if let Err(e) = self.graph.add_edge(resolved) {
                    warn!("Dropping unresolvable edge into {node_id}: {e}");
                } else {
                    self.edges_traversed += 1;
                }
            }
        }

        self.expand_frontier(&node_id, &current_url, &elements);
    }

    /// Push in-scope link targets onto the frontier and record their edges.
    fn expand_frontier(
        &mut self,
        node_id: &str,
        current_url: &str,
        elements: &[crate::dom::InteractiveElement],
    ) {
        let Ok(base) = Url::parse(current_url) else {
            return;
        };
        for element in elements {
            if element.category != ElementCategory::NavigationLink {
                continue;
            }
            let Some(href) = element.href.as_deref() else {
                continue;
            };
            let Ok(absolute) = base.join(href) else {
                continue;
            };
            if !matches!(absolute.scheme(), "http" | "https") {
                continue;
            }
            let absolute = absolute.to_string();
            if !self.scope.evaluate(&absolute).is_allowed() {
                continue;
            }

            self.frontier.push_back(absolute.clone());
            self.activated_elements.insert(element.selector.clone());

            let target_url = normalize_url(&absolute);
            if let Some(target_id) = self.node_by_url.get(&target_url) {
                let edge = AppEdge {
                    source_id: node_id.to_string(),
                    target_id: target_id.clone(),
                    action_type: ActionType::Navigation,
                    selector: element.selector.clone(),
                    http_status: None,
                };
                if let Err(e) = self.graph.add_edge(edge) {
                    warn!("Failed to record edge from {node_id}: {e}");
                }
            } else {
                self.pending_edges
                    .entry(target_url)
                    .or_default()
                    .push(PendingEdge {
                        source_id: node_id.to_string(),
                        selector: element.selector.clone(),
                    });
            }
        }
    }
}
