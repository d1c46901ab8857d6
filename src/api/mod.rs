pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::analysis_api_router;
pub use server::{start_api_server, ApiServer};
pub use types::{ApiContext, JobStatusResponse, SubmitAnalysisRequest, SubmitAnalysisResponse};
