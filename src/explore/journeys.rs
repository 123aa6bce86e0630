//! User-journey detection over a completed graph.
//!
//! Journeys are semantically labeled paths: logging in, submitting a form,
//! or following a chain of navigation links. Detection is pure graph
//! analysis; no browser involved.

use serde::{Deserialize, Serialize};

use super::graph::{ActionType, AppEdge, AppGraph, AppNode};

/// Journey classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JourneyType {
    Authentication,
    FormSubmission,
    ContentNavigation,
    Custom,
}

impl JourneyType {
    const fn label(self) -> &'static str {
        match self {
            Self::Authentication => "Authentication",
            Self::FormSubmission => "Form Submission",
            Self::ContentNavigation => "Content Navigation",
            Self::Custom => "Custom",
        }
    }
}

/// A labeled path through the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserJourney {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub journey_type: JourneyType,
    pub steps: Vec<AppEdge>,
    pub entry_node_id: String,
    pub exit_node_id: String,
}

const LOGIN_TOKENS: [&str; 5] = ["login", "signin", "sign-in", "/auth", "sign in"];

fn is_login_node(node: &AppNode) -> bool {
    let url = node.url.to_lowercase();
    let title = node.title.to_lowercase();
    LOGIN_TOKENS
        .iter()
        .any(|token| url.contains(token) || title.contains(token))
}

fn node_label(node: &AppNode) -> &str {
    if node.title.is_empty() {
        &node.url
    } else {
        &node.title
    }
}

fn journey_name(journey_type: JourneyType, entry: &AppNode, exit: &AppNode) -> String {
    format!(
        "{}: {} → {}",
        journey_type.label(),
        node_label(entry),
        node_label(exit)
    )
}

/// Identify every journey in a completed graph.
#[must_use]
pub fn identify_journeys(graph: &AppGraph) -> Vec<UserJourney> {
    let mut journeys = Vec::new();
    let mut next_id = 0usize;
    let mut push = |journeys: &mut Vec<UserJourney>,
                    journey_type: JourneyType,
                    steps: Vec<AppEdge>,
                    entry: &AppNode,
                    exit: &AppNode| {
        next_id += 1;
        journeys.push(UserJourney {
            id: format!("journey-{next_id}"),
            name: journey_name(journey_type, entry, exit),
            journey_type,
            steps,
            entry_node_id: entry.id.clone(),
            exit_node_id: exit.id.clone(),
        });
    };

    // Authentication: a form submit leaving a login page.
    for node in graph.nodes() {
        if !is_login_node(node) {
            continue;
        }
        for edge in graph.edges_from(&node.id) {
            if edge.action_type != ActionType::FormSubmit {
                continue;
            }
            if let Some(target) = graph.node(&edge.target_id)
                && !is_login_node(target)
            {
                push(
                    &mut journeys,
                    JourneyType::Authentication,
                    vec![edge.clone()],
                    node,
                    target,
                );
            }
        }
    }

    // Form submission: form submits from non-login pages.
    for edge in graph.edges() {
        if edge.action_type != ActionType::FormSubmit {
            continue;
        }
        let Some(source) = graph.node(&edge.source_id) else {
            continue;
        };
        if is_login_node(source) {
            continue;
        }
        if let Some(target) = graph.node(&edge.target_id) {
            push(
                &mut journeys,
                JourneyType::FormSubmission,
                vec![edge.clone()],
                source,
                target,
            );
        }
    }

    // Content navigation: unambiguous chains of navigation links.
    let mut visited: std::collections::HashSet<&str> = std::collections::HashSet::new();
    for node in graph.nodes() {
        if visited.contains(node.id.as_str()) {
            continue;
        }
        let mut steps = Vec::new();
        let mut current = node;
        visited.insert(current.id.as_str());
        loop {
            let nav_edges: Vec<&AppEdge> = graph
                .edges_from(&current.id)
                .filter(|e| e.action_type == ActionType::Navigation)
                .collect();
            let [only] = nav_edges.as_slice() else {
                break;
            };
            let Some(target) = graph.node(&only.target_id) else {
                break;
            };
            if visited.contains(target.id.as_str()) {
                break;
            }
            steps.push((*only).clone());
            visited.insert(target.id.as_str());
            current = target;
        }
        if steps.len() >= 2 {
            push(
                &mut journeys,
                JourneyType::ContentNavigation,
                steps,
                node,
                current,
            );
        }
    }

    journeys
}

/// Classify an ad-hoc step list against the graph it came from.
#[must_use]
pub fn classify_steps(graph: &AppGraph, steps: &[AppEdge]) -> JourneyType {
    if let Some(first) = steps.first()
        && first.action_type == ActionType::FormSubmit
        && graph.node(&first.source_id).is_some_and(is_login_node)
        && graph
            .node(&first.target_id)
            .is_some_and(|target| !is_login_node(target))
    {
        return JourneyType::Authentication;
    }
    if steps
        .iter()
        .any(|edge| edge.action_type == ActionType::FormSubmit)
    {
        return JourneyType::FormSubmission;
    }
    if !steps.is_empty()
        && steps
            .iter()
            .all(|edge| edge.action_type == ActionType::Navigation)
    {
        return JourneyType::ContentNavigation;
    }
    JourneyType::Custom
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn node(id: &str, url: &str, title: &str) -> AppNode {
        AppNode {
            id: id.to_string(),
            url: url.to_string(),
            title: title.to_string(),
            element_count: 0,
            discovery_timestamp: Utc::now(),
            dom_hash: format!("h-{id}"),
            screenshot_path: None,
        }
    }

    fn edge(from: &str, to: &str, action: ActionType) -> AppEdge {
        AppEdge {
            source_id: from.to_string(),
            target_id: to.to_string(),
            action_type: action,
            selector: String::new(),
            http_status: None,
        }
    }

    fn site() -> AppGraph {
        let mut g = AppGraph::new("https://a.com/");
        g.add_node(node("login", "https://a.com/login", "Sign in")).unwrap();
        g.add_node(node("home", "https://a.com/home", "Home")).unwrap();
        g.add_node(node("news", "https://a.com/news", "News")).unwrap();
        g.add_node(node("story", "https://a.com/news/1", "Story")).unwrap();
        g.add_node(node("contact", "https://a.com/contact", "Contact")).unwrap();
        g.add_edge(edge("login", "home", ActionType::FormSubmit)).unwrap();
        g.add_edge(edge("home", "news", ActionType::Navigation)).unwrap();
        g.add_edge(edge("news", "story", ActionType::Navigation)).unwrap();
        g.add_edge(edge("contact", "home", ActionType::FormSubmit)).unwrap();
        g
    }

    #[test]
    fn login_form_submit_is_an_authentication_journey() {
        let journeys = identify_journeys(&site());
        let auth: Vec<_> = journeys
            .iter()
            .filter(|j| j.journey_type == JourneyType::Authentication)
            .collect();
        assert_eq!(auth.len(), 1);
        assert_eq!(auth[0].entry_node_id, "login");
        assert_eq!(auth[0].exit_node_id, "home");
        assert_eq!(auth[0].name, "Authentication: Sign in → Home");
    }

    #[test]
    fn non_login_form_submit_is_a_form_journey() {
        let journeys = identify_journeys(&site());
        let forms: Vec<_> = journeys
            .iter()
            .filter(|j| j.journey_type == JourneyType::FormSubmission)
            .collect();
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].entry_node_id, "contact");
    }

    #[test]
    fn navigation_chain_of_two_edges_is_a_journey() {
        let journeys = identify_journeys(&site());
        let nav: Vec<_> = journeys
            .iter()
            .filter(|j| j.journey_type == JourneyType::ContentNavigation)
            .collect();
        assert_eq!(nav.len(), 1);
        assert_eq!(nav[0].steps.len(), 2);
        assert_eq!(nav[0].entry_node_id, "home");
        assert_eq!(nav[0].exit_node_id, "story");
    }

    #[test]
    fn step_classification_covers_all_arms() {
        let g = site();
        assert_eq!(
            classify_steps(&g, &[edge("login", "home", ActionType::FormSubmit)]),
            JourneyType::Authentication
        );
        assert_eq!(
            classify_steps(&g, &[edge("contact", "home", ActionType::FormSubmit)]),
            JourneyType::FormSubmission
        );
        assert_eq!(
            classify_steps(&g, &[edge("home", "news", ActionType::Navigation)]),
            JourneyType::ContentNavigation
        );
        assert_eq!(
            classify_steps(
                &g,
                &[
                    edge("home", "news", ActionType::Navigation),
                    edge("news", "story", ActionType::Click),
                ]
            ),
            JourneyType::Custom
        );
    }
}
