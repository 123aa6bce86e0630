//! Test-case model.
//!
//! Suites and test cases are produced by the generation phase and consumed
//! read-only by the scheduler and executor; everything here is plain data.

use serde::{Deserialize, Serialize};

/// A named collection of test cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuite {
    pub name: String,
    pub test_cases: Vec<TestCase>,
}

/// One executable test: setup, main, and teardown step lists plus metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: String,
    pub name: String,
    pub suite: String,
    #[serde(default)]
    pub setup: Vec<TestStep>,
    pub steps: Vec<TestStep>,
    #[serde(default)]
    pub teardown: Vec<TestStep>,
    #[serde(default)]
    pub metadata: TestMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestMetadata {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub priority: Option<String>,
    /// Journey id this test was generated from, when applicable
    #[serde(default)]
    pub source_journey: Option<String>,
}

/// Step action dispatched by the executor. Unrecognized actions
/// deserialize to `Other` and execute as no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepAction {
    Click,
    Navigation,
    FormSubmit,
    Other,
}

impl From<String> for StepAction {
    fn from(value: String) -> Self {
        match value.as_str() {
            "click" => Self::Click,
            "navigation" => Self::Navigation,
            "form-submit" => Self::FormSubmit,
            _ => Self::Other,
        }
    }
}

impl From<StepAction> for String {
    fn from(action: StepAction) -> Self {
        match action {
            StepAction::Click => "click",
            StepAction::Navigation => "navigation",
            StepAction::FormSubmit => "form-submit",
            StepAction::Other => "unknown",
        }
        .to_string()
    }
}

/// One step: an action on a selector plus the assertions checked after it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStep {
    pub action: StepAction,
    /// Target selector, or the URL for navigation steps
    pub selector: String,
    #[serde(default)]
    pub assertions: Vec<TestAssertion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssertionType {
    Visibility,
    TextContent,
    UrlMatch,
    ElementCount,
    AttributeValue,
}

/// A single check evaluated after a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestAssertion {
    #[serde(rename = "type")]
    pub assertion_type: AssertionType,
    pub selector: String,
    pub expected: String,
    /// Generator confidence in [0, 1]
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_actions_deserialize_to_other() {
        let step: TestStep = serde_json::from_str(
            r##"{"action": "drag-and-drop", "selector": "#widget", "assertions": []}"##,
        )
        .unwrap();
        assert_eq!(step.action, StepAction::Other);
    }

    #[test]
    fn assertion_type_uses_kebab_case_tags() {
        let assertion: TestAssertion = serde_json::from_str(
            r#"{"type": "text-content", "selector": "h1", "expected": "Welcome"}"#,
        )
        .unwrap();
        assert_eq!(assertion.assertion_type, AssertionType::TextContent);
    }
}
