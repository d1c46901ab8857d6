//! Analysis API router.
//!
//! Returns a composable `Router` that can be mounted on any axum
//! server. The wire contract lives in `api::types`.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the analysis API router.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn analysis_api_router(core: Arc<CoreState>) -> Router {
    let ctx = ApiContext::new(core);
    Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/analysis-jobs", post(endpoints::analysis::submit))
        .route("/analysis-jobs/:id/status", get(endpoints::analysis::status))
        .with_state(ctx)
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use base64::Engine;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::RuntimeConfig;
    use crate::pipeline::analysis::{AnalysisError, InMemoryJobStore, MockAiClient};

    fn test_router_with_ai(ai: MockAiClient) -> Router {
        let state = CoreState::with_parts(
            RuntimeConfig::from_env(),
            Arc::new(InMemoryJobStore::new()),
            Arc::new(ai),
        );
        analysis_api_router(Arc::new(state))
    }

    fn test_router() -> Router {
        test_router_with_ai(MockAiClient::new(json!({
            "summary": "test summary",
            "outOfRange": [{"name": "Glucose", "value": "105"}],
            "recommendations": ["retest fasting glucose in three months"]
        })))
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let response = test_router().oneshot(get_req("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn submit_manual_text_returns_202_with_job_id() {
        let router = test_router();
        let response = router
            .oneshot(post_json(
                "/analysis-jobs",
                json!({"manualSummaryText": "Glucose 105 mg/dL (70-99)"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = json_body(response).await;
        assert!(body["jobId"].as_str().is_some());
    }

    #[tokio::test]
    async fn submitted_job_reaches_completed_status() {
        let router = test_router();
        let response = router
            .clone()
            .oneshot(post_json(
                "/analysis-jobs",
                json!({"manualSummaryText": "Glucose 105 mg/dL (70-99)"}),
            ))
            .await
            .unwrap();
        let job_id = json_body(response).await["jobId"]
            .as_str()
            .unwrap()
            .to_string();

        let mut last = Value::Null;
        for _ in 0..200 {
            let response = router
                .clone()
                .oneshot(get_req(&format!("/analysis-jobs/{job_id}/status")))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            last = json_body(response).await;
            if last["status"] == "completed" || last["status"] == "failed" {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        assert_eq!(last["status"], "completed");
        assert_eq!(last["progress"], 100);
        assert_eq!(last["isProcessing"], false);
        assert_eq!(last["data"]["summary"], "test summary");
        assert_eq!(last["data"]["markers"][0]["name"], "Glucose");
    }

    #[tokio::test]
    async fn failed_job_surfaces_error_through_status() {
        let router =
            test_router_with_ai(MockAiClient::failing(AnalysisError::UpstreamUnavailable(
                "502 from model gateway".into(),
            )));
        let response = router
            .clone()
            .oneshot(post_json(
                "/analysis-jobs",
                json!({"manualSummaryText": "some text"}),
            ))
            .await
            .unwrap();
        let job_id = json_body(response).await["jobId"]
            .as_str()
            .unwrap()
            .to_string();

        let mut last = Value::Null;
        for _ in 0..200 {
            let response = router
                .clone()
                .oneshot(get_req(&format!("/analysis-jobs/{job_id}/status")))
                .await
                .unwrap();
            last = json_body(response).await;
            if last["status"] == "failed" {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        assert_eq!(last["status"], "failed");
        assert!(last["error"].as_str().unwrap().contains("unavailable"));
        assert!(last.get("data").is_none());
    }

    #[tokio::test]
    async fn empty_submission_is_rejected() {
        let response = test_router()
            .oneshot(post_json("/analysis-jobs", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn oversized_document_is_rejected_before_extraction() {
        let oversized = vec![0u8; crate::config::MAX_UPLOAD_BYTES + 1];
        let encoded = base64::engine::general_purpose::STANDARD.encode(&oversized);
        let response = test_router()
            .oneshot(post_json("/analysis-jobs", json!({"document": encoded})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn unsupported_content_is_rejected() {
        // ZIP magic bytes: not PDF/JPEG/PNG and not plain text.
        let mut bytes = vec![0x50, 0x4B, 0x03, 0x04];
        bytes.extend(std::iter::repeat(0u8).take(300));
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let response = test_router()
            .oneshot(post_json("/analysis-jobs", json!({"document": encoded})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn unknown_job_is_404() {
        let response = test_router()
            .oneshot(get_req(&format!(
                "/analysis-jobs/{}/status",
                uuid::Uuid::new_v4()
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_job_id_is_400() {
        let response = test_router()
            .oneshot(get_req("/analysis-jobs/not-a-uuid/status"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
