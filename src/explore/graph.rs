//! Navigation graph of the explored application.
//!
//! The store is owned and mutable inside the exploration loop; everyone
//! else sees immutable snapshots. Every edge's source must refer to an
//! existing node at insertion time, and a completed graph never carries an
//! empty target id.

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;

/// A discovered page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppNode {
    pub id: String,
    pub url: String,
    pub title: String,
    pub element_count: usize,
    pub discovery_timestamp: DateTime<Utc>,
    pub dom_hash: String,
    #[serde(default)]
    pub screenshot_path: Option<PathBuf>,
}

/// How a transition between two nodes is triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionType {
    Click,
    FormSubmit,
    Navigation,
}

/// A discovered transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppEdge {
    pub source_id: String,
    pub target_id: String,
    pub action_type: ActionType,
    pub selector: String,
    #[serde(default)]
    pub http_status: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMetadata {
    pub start_url: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// The application graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppGraph {
    nodes: Vec<AppNode>,
    edges: Vec<AppEdge>,
    metadata: GraphMetadata,
}

impl AppGraph {
    /// Fresh graph anchored to `start_url`.
    #[must_use]
    pub fn new(start_url: &str) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            metadata: GraphMetadata {
                start_url: start_url.to_string(),
                started_at: Utc::now(),
                completed_at: None,
            },
        }
    }

    pub fn add_node(&mut self, node: AppNode) -> Result<()> {
        if self.nodes.iter().any(|n| n.id == node.id) {
            bail!("Node {} already exists", node.id);
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Append an edge. The source must exist; the target must exist and be
    /// non-empty (pending edges are buffered by the exploration loop until
    /// their target node is created).
    pub fn add_edge(&mut self, edge: AppEdge) -> Result<()> {
        if !self.nodes.iter().any(|n| n.id == edge.source_id) {
            bail!("Edge source {} refers to no node", edge.source_id);
        }
        if edge.target_id.is_empty() || !self.nodes.iter().any(|n| n.id == edge.target_id) {
            bail!("Edge target {:?} refers to no node", edge.target_id);
        }
        self.edges.push(edge);
        Ok(())
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&AppNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    #[must_use]
    pub fn nodes(&self) -> &[AppNode] {
        &self.nodes
    }

    #[must_use]
    pub fn edges(&self) -> &[AppEdge] {
        &self.edges
    }

    #[must_use]
    pub fn metadata(&self) -> &GraphMetadata {
        &self.metadata
    }

    pub fn edges_from(&self, id: &str) -> impl Iterator<Item = &AppEdge> {
        self.edges.iter().filter(move |e| e.source_id == id)
    }

    /// Enumerate all acyclic paths from `from` to `to` as edge sequences.
    ///
    /// Breadth-first over partial paths; a node is never revisited within a
    /// single path. Can still be exponential on dense graphs, so callers
    /// bound the graphs they hand in. Returns an empty vector when no path
    /// exists.
    #[must_use]
    pub fn find_paths(&self, from: &str, to: &str) -> Vec<Vec<AppEdge>> {
        let mut complete = Vec::new();
        let mut frontier: VecDeque<(String, Vec<AppEdge>, HashSet<String>)> = VecDeque::new();
        frontier.push_back((
            from.to_string(),
            Vec::new(),
            HashSet::from([from.to_string()]),
        ));

        while let Some((current, path, seen)) = frontier.pop_front() {
            if current == to && !path.is_empty() {
                complete.push(path);
                continue;
            }
            for edge in self.edges_from(&current) {
                if seen.contains(&edge.target_id) {
                    continue;
                }
                let mut next_path = path.clone();
                next_path.push(edge.clone());
                let mut next_seen = seen.clone();
                next_seen.insert(edge.target_id.clone());
                frontier.push_back((edge.target_id.clone(), next_path, next_seen));
            }
        }
        complete
    }

    /// Seal the graph, stamping `completed_at`.
    pub fn complete(&mut self) {
        self.metadata.completed_at = Some(Utc::now());
    }

    /// JSON snapshot preserving every field.
    pub fn serialize(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn deserialize(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> AppNode {
        AppNode {
            id: id.to_string(),
            url: format!("https://a.com/{id}"),
            title: id.to_uppercase(),
            element_count: 1,
            discovery_timestamp: Utc::now(),
            dom_hash: format!("hash-{id}"),
            screenshot_path: None,
        }
    }

    fn edge(from: &str, to: &str) -> AppEdge {
        AppEdge {
            source_id: from.to_string(),
            target_id: to.to_string(),
            action_type: ActionType::Navigation,
            selector: format!("a[href='/{to}']"),
            http_status: Some(200),
        }
    }

    fn diamond() -> AppGraph {
        let mut g = AppGraph::new("https://a.com/");
        for id in ["a", "b", "c", "d"] {
            g.add_node(node(id)).unwrap();
        }
        for (from, to) in [("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")] {
            g.add_edge(edge(from, to)).unwrap();
        }
        g
    }

    #[test]
    fn edge_endpoints_must_exist() {
        let mut g = AppGraph::new("https://a.com/");
        g.add_node(node("a")).unwrap();
        assert!(g.add_edge(edge("missing", "a")).is_err());
        assert!(g.add_edge(edge("a", "missing")).is_err());
        assert!(g.add_edge(edge("a", "")).is_err());
    }

    #[test]
    fn find_paths_enumerates_both_diamond_arms() {
        let g = diamond();
        let paths = g.find_paths("a", "d");
        assert_eq!(paths.len(), 2);
        for path in &paths {
            assert_eq!(path.len(), 2);
            assert_eq!(path[0].source_id, "a");
            assert_eq!(path[1].target_id, "d");
        }
    }

    #[test]
    fn find_paths_returns_empty_when_unreachable() {
        let g = diamond();
        assert!(g.find_paths("d", "a").is_empty());
    }

    #[test]
    fn cycles_do_not_hang_path_search() {
        let mut g = diamond();
        g.add_edge(edge("d", "a")).unwrap();
        let paths = g.find_paths("a", "d");
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn serialization_round_trips() {
        let mut g = diamond();
        g.complete();
        let json = g.serialize().unwrap();
        let back = AppGraph::deserialize(&json).unwrap();
        assert_eq!(g, back);
        assert!(back.metadata().completed_at.is_some());
    }
}
