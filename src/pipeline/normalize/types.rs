use serde::{Deserialize, Serialize};

/// Sub-fields a marker always carries; missing values are filled with
/// this placeholder, never left null.
pub const MARKER_FIELD_PLACEHOLDER: &str = "not reported";

/// Recommendations at or below this length are noise and are dropped.
pub const MIN_RECOMMENDATION_CHARS: usize = 5;

/// Free-text summaries are truncated to this length for display.
pub const SUMMARY_DISPLAY_LIMIT: usize = 600;

/// Shown when the model produced markers but no usable recommendations.
pub const DEFAULT_RECOMMENDATION_WITH_MARKERS: &str =
    "Discuss the out-of-range values with your clinician or a relevant specialist.";

/// Shown when the model produced no markers and no usable recommendations.
pub const DEFAULT_RECOMMENDATION_GENERAL: &str =
    "Maintain regular checkups and a balanced diet, and repeat testing as advised.";

/// One out-of-reference-range clinical value with interpretation.
///
/// Unique by `name` within a result (case-sensitive); duplicates are
/// merged first-seen-wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub name: String,
    pub value: String,
    pub unit: String,
    pub reference_range: String,
    pub interpretation: String,
}

impl Marker {
    /// Marker with every sub-field defaulted except the name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: MARKER_FIELD_PLACEHOLDER.to_string(),
            unit: MARKER_FIELD_PLACEHOLDER.to_string(),
            reference_range: MARKER_FIELD_PLACEHOLDER.to_string(),
            interpretation: MARKER_FIELD_PLACEHOLDER.to_string(),
        }
    }
}

/// Per-page summary retained for traceability on multi-page documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub page_number: usize,
    pub summary: String,
}

/// The canonical analysis result.
///
/// Constructible from any AI output, including malformed or empty ones:
/// `summary` and `recommendations` are never empty, markers are unique
/// by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalResult {
    pub summary: String,
    pub markers: Vec<Marker>,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<PageSummary>>,
}

impl CanonicalResult {
    /// Synthesized summary for a result that arrived without one.
    pub fn synthesized_summary(marker_count: usize) -> String {
        if marker_count > 0 {
            format!(
                "{marker_count} value(s) outside the reference range were found. \
                 Review the details below with your care team."
            )
        } else {
            "Analysis completed. No out-of-range values were identified.".to_string()
        }
    }
}

/// Truncate display text at a character boundary, appending an ellipsis.
pub fn truncate_for_display(text: &str, limit: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= limit {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(limit.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}
