//! The analysis job record — the only shared mutable state between the
//! controller (single writer) and status readers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::normalize::CanonicalResult;

// ── Progress milestones ─────────────────────────────────────

/// Progress once extraction has produced text.
pub const PROGRESS_EXTRACTED: u8 = 25;

/// Upper bound for per-page analysis progress; the gap to 100 is
/// reserved for normalization and persistence.
pub const PROGRESS_PAGES_END: u8 = 90;

/// Progress once the canonical result has been assembled.
pub const PROGRESS_NORMALIZED: u8 = 95;

/// Reached if and only if the job completes.
pub const PROGRESS_DONE: u8 = 100;

/// Lifecycle state of one analysis request.
///
/// Pending (accepted, not started) and Processing (extraction/AI
/// running) are distinct states; conflating them breaks the client's
/// completion detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One tracked asynchronous analysis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub id: Uuid,
    pub status: JobStatus,
    /// 0–100, monotonically non-decreasing while non-terminal.
    pub progress: u8,
    /// Opaque AI output, present only once Completed.
    pub raw_result: Option<serde_json::Value>,
    /// Present only once Completed.
    pub canonical_result: Option<CanonicalResult>,
    /// Present only once Failed.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AnalysisJob {
    /// Fresh job in Pending.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Pending,
            progress: 0,
            raw_result: None,
            canonical_result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for AnalysisJob {
    fn default() -> Self {
        Self::new()
    }
}
