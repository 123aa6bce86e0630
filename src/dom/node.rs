//! Parsed DOM tree model.
//!
//! `RawDomData` is the shape returned by the in-page extraction script;
//! [`DomNode`] is the owned tree with derived locators. The tree is acyclic
//! and owned by the extraction that produced it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Element geometry in CSS pixels. Immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Raw element data as serialized by the extraction script.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDomData {
    pub tag: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub text_content: String,
    #[serde(default)]
    pub children: Vec<RawDomData>,
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
    #[serde(default)]
    pub is_visible: bool,
}

/// Raw accessibility-tree node as serialized by the ARIA walker script.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAccessibilityNode {
    pub role: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub children: Vec<RawAccessibilityNode>,
}

/// A parsed DOM element with derived locators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomNode {
    /// Lower-case tag name
    pub tag: String,
    pub id: Option<String>,
    /// Class names in declaration order
    pub classes: Vec<String>,
    /// Attribute map; key order is irrelevant
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub children: Vec<DomNode>,
    pub bounding_box: Option<BoundingBox>,
    pub is_visible: bool,
    /// Absolute XPath derived from the node's position
    pub xpath: String,
    /// CSS selector derived from id, classes, and sibling position
    pub css_selector: String,
}

impl DomNode {
    /// Build the owned tree from raw extraction data, deriving xpath and
    /// CSS selectors along the way.
    #[must_use]
    pub fn from_raw(raw: RawDomData) -> Self {
        Self::build(raw, "", "", 1)
    }

    fn build(raw: RawDomData, parent_xpath: &str, parent_css: &str, ordinal: usize) -> Self {
        let tag = raw.tag.to_lowercase();
        let xpath = format!("{parent_xpath}/{tag}[{ordinal}]");

        let css_selector = if let Some(id) = raw.id.as_deref().filter(|id| !id.is_empty()) {
            format!("#{id}")
        } else {
            let mut step = tag.clone();
            for class in &raw.classes {
                if !class.is_empty() {
                    step.push('.');
                    step.push_str(class);
                }
            }
            step.push_str(&format!(":nth-of-type({ordinal})"));
            if parent_css.is_empty() {
                step
            } else {
                format!("{parent_css} > {step}")
            }
        };

        // Per-tag ordinals for the children, counted in declared order.
        let mut seen: BTreeMap<String, usize> = BTreeMap::new();
        let children = raw
            .children
            .into_iter()
            .map(|child| {
                let child_tag = child.tag.to_lowercase();
                let n = seen.entry(child_tag).or_insert(0);
                *n += 1;
                Self::build(child, &xpath, &css_selector, *n)
            })
            .collect();

        Self {
            tag,
            id: raw.id,
            classes: raw.classes,
            attributes: raw.attributes,
            text: raw.text_content,
            children,
            bounding_box: raw.bounding_box,
            is_visible: raw.is_visible,
            xpath,
            css_selector,
        }
    }

    /// Depth-first traversal over the subtree, including `self`.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a DomNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Attribute lookup.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}
