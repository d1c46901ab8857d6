//! Analysis job endpoints — submission and the polled status query.
//!
//! Upload constraints are enforced here, before any extraction work:
//! size cap first, then magic-byte format detection. The status
//! endpoint re-serves the persisted canonical result without touching
//! the AI collaborator again.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use base64::Engine;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{
    ApiContext, JobStatusResponse, SubmitAnalysisRequest, SubmitAnalysisResponse,
};
use crate::config;
use crate::pipeline::analysis::AnalysisInput;
use crate::pipeline::extraction::detect_format;

/// `POST /analysis-jobs` — accept a document and/or manual text for
/// analysis. Returns `202 Accepted` with the job id; all further
/// progress is reported through the status endpoint.
pub async fn submit(
    State(ctx): State<ApiContext>,
    Json(payload): Json<SubmitAnalysisRequest>,
) -> Result<(StatusCode, Json<SubmitAnalysisResponse>), ApiError> {
    let document = match payload.document.as_deref() {
        Some(encoded) => Some(decode_document(encoded)?),
        None => None,
    };

    if let Some(bytes) = &document {
        if bytes.len() > config::MAX_UPLOAD_BYTES {
            return Err(ApiError::PayloadTooLarge(format!(
                "{} bytes exceeds the {} byte limit",
                bytes.len(),
                config::MAX_UPLOAD_BYTES
            )));
        }
        let format = detect_format(bytes);
        if !format.category.is_supported() {
            return Err(ApiError::UnsupportedMediaType(format!(
                "{} is not an accepted document type",
                format.mime_type
            )));
        }
        tracing::debug!(
            mime = %format.mime_type,
            size = format.file_size_bytes,
            "Upload accepted"
        );
    }

    let job_id = ctx.core.controller.submit(AnalysisInput {
        document,
        manual_summary_text: payload.manual_summary_text,
        subject_ref: payload.subject_ref,
    })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitAnalysisResponse {
            job_id: job_id.to_string(),
        }),
    ))
}

/// `GET /analysis-jobs/{id}/status` — read-only job snapshot, polled
/// by the client.
pub async fn status(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let job_id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::BadRequest(format!("'{id}' is not a valid job id")))?;

    let job = ctx
        .core
        .controller
        .get_status(&job_id)
        .ok_or_else(|| ApiError::NotFound(format!("No analysis job {job_id}")))?;

    Ok(Json(JobStatusResponse::from(&job)))
}

/// Decode a base64 document, accepting both raw base64 and data URLs
/// (`data:application/pdf;base64,...`).
fn decode_document(encoded: &str) -> Result<Vec<u8>, ApiError> {
    let base64_data = match encoded.find(',') {
        Some(idx) => &encoded[idx + 1..],
        None => encoded,
    };
    base64::engine::general_purpose::STANDARD
        .decode(base64_data.trim())
        .map_err(|e| ApiError::BadRequest(format!("Invalid base64 document: {e}")))
}
