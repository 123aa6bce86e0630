//! DOM extraction, modeling, hashing, and classification.
//!
//! The shared substrate of both engines: pages are pulled through the
//! driver's evaluate into [`RawDomData`], parsed into [`DomNode`] trees,
//! hashed for state fingerprinting, and classified for frontier expansion
//! and form handling.

pub mod classify;
pub mod hasher;
pub mod node;
pub mod scripts;

use anyhow::{Context, Result};

use crate::browser::{BrowserEngine, PageId};

pub use classify::{
    DetectedForm, ElementCategory, InteractiveElement, classify_interactive_elements,
    detect_forms, detect_modal_indicators,
};
pub use hasher::hash_dom;
pub use node::{BoundingBox, DomNode, RawAccessibilityNode, RawDomData};

/// Extract and parse the full DOM of a page.
pub async fn extract_dom(engine: &dyn BrowserEngine, page: PageId) -> Result<DomNode> {
    let value = engine
        .evaluate(page, scripts::DOM_EXTRACTION_SCRIPT)
        .await
        .context("DOM extraction script failed")?;
    let raw: RawDomData =
        serde_json::from_value(value).context("DOM extraction returned an unexpected shape")?;
    Ok(DomNode::from_raw(raw))
}

/// Extract the accessibility tree of a page.
pub async fn extract_accessibility(
    engine: &dyn BrowserEngine,
    page: PageId,
) -> Result<RawAccessibilityNode> {
    let value = engine
        .evaluate(page, scripts::ACCESSIBILITY_SCRIPT)
        .await
        .context("Accessibility extraction script failed")?;
    serde_json::from_value(value).context("Accessibility extraction returned an unexpected shape")
}
