pub mod job;
pub mod store;
pub mod ai;
pub mod controller;

pub use job::*;
pub use store::*;
pub use ai::*;
pub use controller::*;

use thiserror::Error;

/// Failures from the AI analysis stage.
///
/// Recorded on `AnalysisJob.error` and surfaced through the status
/// endpoint — never swallowed into silent nulls.
#[derive(Error, Debug, Clone)]
pub enum AnalysisError {
    #[error("Input exceeds the model's token budget: {0}")]
    TokenLimitExceeded(String),

    #[error("Analysis service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Malformed analysis response: {0}")]
    MalformedResponse(String),

    #[error("Analysis timed out after {0}s")]
    Timeout(u64),
}
