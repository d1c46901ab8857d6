//! Demonstration content for when the status endpoint is unreachable.
//!
//! This is a UX safety net, not data fabrication: every result from
//! here is tagged `is_demo: true` and clearly labeled, and nothing in
//! the server-side pipeline can reach this module.

use serde::{Deserialize, Serialize};

use crate::pipeline::normalize::{CanonicalResult, Marker};

/// An analysis result that did NOT come from the real pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoAnalysis {
    pub is_demo: bool,
    pub result: CanonicalResult,
}

/// The one place demo content is produced.
pub struct FallbackResultProvider;

impl FallbackResultProvider {
    /// Placeholder result shown when the real pipeline cannot answer.
    pub fn demo_result() -> DemoAnalysis {
        DemoAnalysis {
            is_demo: true,
            result: CanonicalResult {
                summary: "Sample analysis (demonstration only — the analysis service could not \
                          be reached). Two values fall outside their reference ranges in this \
                          example panel."
                    .to_string(),
                markers: vec![
                    Marker {
                        name: "Glucose".into(),
                        value: "105".into(),
                        unit: "mg/dL".into(),
                        reference_range: "70-99".into(),
                        interpretation: "slightly high (example)".into(),
                    },
                    Marker {
                        name: "Vitamin D".into(),
                        value: "22".into(),
                        unit: "ng/mL".into(),
                        reference_range: "30-100".into(),
                        interpretation: "low (example)".into(),
                    },
                ],
                recommendations: vec![
                    "This is sample content. Retry once your connection is restored.".into(),
                    "Example guidance: discuss borderline glucose with your clinician.".into(),
                ],
                pages: None,
            },
        }
    }
}
