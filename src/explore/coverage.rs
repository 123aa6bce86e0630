//! Coverage ratios and threshold checks.

use serde::{Deserialize, Serialize};

/// A covered/total pair with its derived percentage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageRatio {
    pub covered: usize,
    pub total: usize,
    pub percentage: f64,
}

impl CoverageRatio {
    /// `percentage` is 0 when `total` is 0, otherwise exactly
    /// `100 * covered / total`.
    #[must_use]
    pub fn new(covered: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            0.0
        } else {
            100.0 * covered as f64 / total as f64
        };
        Self {
            covered,
            total,
            percentage,
        }
    }
}

/// Page, element, and path coverage of one exploration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageMetrics {
    pub page_coverage: CoverageRatio,
    pub element_coverage: CoverageRatio,
    pub path_coverage: CoverageRatio,
}

/// Derive the three coverage axes from raw counts.
#[must_use]
pub fn calculate_coverage(
    pages_visited: usize,
    pages_discovered: usize,
    elements_activated: usize,
    elements_found: usize,
    edges_traversed: usize,
    edges_discovered: usize,
) -> CoverageMetrics {
    CoverageMetrics {
        page_coverage: CoverageRatio::new(pages_visited, pages_discovered),
        element_coverage: CoverageRatio::new(elements_activated, elements_found),
        path_coverage: CoverageRatio::new(edges_traversed, edges_discovered),
    }
}

/// Minimum percentages per axis; unset axes are ignored.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageThresholds {
    #[serde(default)]
    pub min_page_coverage: Option<f64>,
    #[serde(default)]
    pub min_element_coverage: Option<f64>,
    #[serde(default)]
    pub min_path_coverage: Option<f64>,
}

/// One failing axis with its actual and required percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdShortfall {
    pub axis: String,
    pub actual: f64,
    pub required: f64,
}

/// Outcome of a threshold check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdCheck {
    pub met: bool,
    pub details: Vec<ThresholdShortfall>,
}

/// Compare metrics against thresholds. `met` is true iff every specified
/// axis reaches its minimum; `details` lists each axis that falls short.
#[must_use]
pub fn check_thresholds(
    metrics: &CoverageMetrics,
    thresholds: &CoverageThresholds,
) -> ThresholdCheck {
    let axes = [
        ("page", metrics.page_coverage, thresholds.min_page_coverage),
        (
            "element",
            metrics.element_coverage,
            thresholds.min_element_coverage,
        ),
        ("path", metrics.path_coverage, thresholds.min_path_coverage),
    ];

    let details: Vec<ThresholdShortfall> = axes
        .iter()
        .filter_map(|(axis, ratio, minimum)| {
            minimum.and_then(|required| {
                (ratio.percentage < required).then(|| ThresholdShortfall {
                    axis: (*axis).to_string(),
                    actual: ratio.percentage,
                    required,
                })
            })
        })
        .collect();

    ThresholdCheck {
        met: details.is_empty(),
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_total_yields_zero_percent() {
        let ratio = CoverageRatio::new(0, 0);
        assert_eq!(ratio.percentage, 0.0);
    }

    #[test]
    fn percentage_is_exact() {
        let ratio = CoverageRatio::new(2, 4);
        assert_eq!(ratio.percentage, 50.0);
    }

    #[test]
    fn unset_thresholds_are_ignored() {
        let metrics = calculate_coverage(1, 10, 0, 0, 0, 0);
        let check = check_thresholds(&metrics, &CoverageThresholds::default());
        assert!(check.met);
        assert!(check.details.is_empty());
    }

    #[test]
    fn failing_axes_are_named_with_both_percentages() {
        let metrics = calculate_coverage(1, 4, 9, 10, 0, 0);
        let thresholds = CoverageThresholds {
            min_page_coverage: Some(50.0),
            min_element_coverage: Some(80.0),
            min_path_coverage: None,
        };
        let check = check_thresholds(&metrics, &thresholds);
        assert!(!check.met);
        assert_eq!(check.details.len(), 1);
        assert_eq!(check.details[0].axis, "page");
        assert_eq!(check.details[0].actual, 25.0);
        assert_eq!(check.details[0].required, 50.0);
    }

    #[test]
    fn meeting_every_axis_passes() {
        let metrics = calculate_coverage(2, 4, 8, 10, 1, 2);
        let thresholds = CoverageThresholds {
            min_page_coverage: Some(50.0),
            min_element_coverage: Some(80.0),
            min_path_coverage: Some(50.0),
        };
        assert!(check_thresholds(&metrics, &thresholds).met);
    }
}
