//! Interactive-element classification and form detection.
//!
//! Works on the parsed tree rather than in-page so that classification is
//! deterministic and testable without a browser.

use serde::{Deserialize, Serialize};

use super::node::DomNode;

/// Category assigned to an interactive element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementCategory {
    /// Anchor with an href, candidate for frontier expansion
    NavigationLink,
    /// Submit control inside a form
    FormSubmit,
    /// Input, select, or textarea
    FormInput,
    /// Clickable control that is not a link or form field
    Button,
    /// Interactive through tabindex/contenteditable/handlers only
    Custom,
}

/// An interactive element found on a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractiveElement {
    pub category: ElementCategory,
    pub selector: String,
    pub href: Option<String>,
    pub text: String,
}

/// A form discovered on a page with its fields and submit control.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedForm {
    pub selector: String,
    pub action: Option<String>,
    pub field_selectors: Vec<String>,
    pub submit_selector: Option<String>,
}

const INTERACTIVE_ROLES: [&str; 8] = [
    "button", "checkbox", "radio", "switch", "tab", "menuitem", "option", "link",
];

fn is_submit_control(node: &DomNode) -> bool {
    match node.tag.as_str() {
        "button" => node.attr("type").is_none_or(|t| t == "submit"),
        "input" => node.attr("type") == Some("submit"),
        _ => false,
    }
}

fn classify(node: &DomNode, inside_form: bool) -> Option<ElementCategory> {
    match node.tag.as_str() {
        "a" if node.attr("href").is_some() => Some(ElementCategory::NavigationLink),
        "button" | "input" if inside_form && is_submit_control(node) => {
            Some(ElementCategory::FormSubmit)
        }
        "input" | "select" | "textarea" => Some(ElementCategory::FormInput),
        "button" => Some(ElementCategory::Button),
        _ => {
            if node.attr("onclick").is_some()
                || node
                    .attr("role")
                    .is_some_and(|r| INTERACTIVE_ROLES.contains(&r))
            {
                Some(ElementCategory::Button)
            } else if node.attr("tabindex").is_some()
                || node.attr("contenteditable") == Some("true")
            {
                Some(ElementCategory::Custom)
            } else {
                None
            }
        }
    }
}

/// Collect every interactive element in the tree, in document order.
#[must_use]
pub fn classify_interactive_elements(root: &DomNode) -> Vec<InteractiveElement> {
    let mut out = Vec::new();
    collect(root, false, &mut out);
    out
}

fn collect(node: &DomNode, inside_form: bool, out: &mut Vec<InteractiveElement>) {
    if let Some(category) = classify(node, inside_form) {
        out.push(InteractiveElement {
            category,
            selector: node.css_selector.clone(),
            href: node.attr("href").map(ToString::to_string),
            text: node.text.clone(),
        });
    }
    let in_form = inside_form || node.tag == "form";
    for child in &node.children {
        collect(child, in_form, out);
    }
}

/// Find every form with its input fields and submit control.
#[must_use]
pub fn detect_forms(root: &DomNode) -> Vec<DetectedForm> {
    let mut forms = Vec::new();
    root.walk(&mut |node| {
        if node.tag == "form" {
            let mut field_selectors = Vec::new();
            let mut submit_selector = None;
            node.walk(&mut |inner| {
                if matches!(inner.tag.as_str(), "input" | "select" | "textarea")
                    && inner.attr("type") != Some("submit")
                {
                    field_selectors.push(inner.css_selector.clone());
                }
                if submit_selector.is_none() && is_submit_control(inner) {
                    submit_selector = Some(inner.css_selector.clone());
                }
            });
            forms.push(DetectedForm {
                selector: node.css_selector.clone(),
                action: node.attr("action").map(ToString::to_string),
                field_selectors,
                submit_selector,
            });
        }
    });
    forms
}

/// Selectors of elements that indicate an open modal or dialog layer.
#[must_use]
pub fn detect_modal_indicators(root: &DomNode) -> Vec<String> {
    let mut indicators = Vec::new();
    root.walk(&mut |node| {
        let is_modal = node.tag == "dialog"
            || node.attr("role") == Some("dialog")
            || node.attr("aria-modal") == Some("true")
            || node.classes.iter().any(|c| c == "modal");
        if is_modal && node.is_visible {
            indicators.push(node.css_selector.clone());
        }
    });
    indicators
}
