//! Shared types for the analysis API layer: the router context and the
//! wire contract both the server and the polling client speak.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core_state::CoreState;
use crate::pipeline::analysis::{AnalysisJob, JobStatus};
use crate::pipeline::normalize::CanonicalResult;

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

// ── Wire contract ───────────────────────────────────────────

/// `POST /analysis-jobs` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnalysisRequest {
    /// Base64-encoded document bytes.
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub manual_summary_text: Option<String>,
    #[serde(default)]
    pub subject_ref: Option<String>,
}

/// `202 Accepted` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnalysisResponse {
    pub job_id: String,
}

/// `GET /analysis-jobs/{id}/status` response body.
///
/// Serialized by the server, deserialized by the polling client — one
/// definition so the two cannot drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub status: JobStatus,
    pub progress: u8,
    pub is_processing: bool,
    /// Canonical result, present only once completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<CanonicalResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&AnalysisJob> for JobStatusResponse {
    fn from(job: &AnalysisJob) -> Self {
        let message = match job.status {
            JobStatus::Pending => Some("Analysis queued".to_string()),
            JobStatus::Processing => Some("Analysis in progress".to_string()),
            JobStatus::Completed => Some("Analysis complete".to_string()),
            JobStatus::Failed => None,
        };
        Self {
            status: job.status,
            progress: job.progress,
            is_processing: job.status == JobStatus::Processing,
            data: job.canonical_result.clone(),
            message,
            error: job.error.clone(),
        }
    }
}
