//! AI analysis collaborator — an opaque function from document text to
//! unstructured JSON. Everything about the model lives behind this
//! boundary; the pipeline only sees `serde_json::Value`.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::AnalysisError;
use crate::config;

/// Inputs larger than this are refused before the network call; the
/// upstream model would reject them anyway, less cheaply.
pub const MAX_ANALYSIS_CHARS: usize = 200_000;

/// AI analysis client abstraction (allows mocking).
#[async_trait]
pub trait AiClient: Send + Sync {
    /// Analyze document text, returning the model's raw JSON output.
    async fn analyze(&self, text: &str) -> Result<Value, AnalysisError>;
}

/// HTTP client for the AI analysis collaborator.
pub struct HttpAiClient {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    text: &'a str,
}

impl HttpAiClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        }
    }

    /// Client pointed at the configured analysis endpoint with the
    /// standard request timeout.
    pub fn from_config(config: &config::RuntimeConfig) -> Self {
        Self::new(&config.ai_base_url, config::AI_TIMEOUT_SECS)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl AiClient for HttpAiClient {
    async fn analyze(&self, text: &str) -> Result<Value, AnalysisError> {
        if text.chars().count() > MAX_ANALYSIS_CHARS {
            return Err(AnalysisError::TokenLimitExceeded(format!(
                "{} chars exceeds the {MAX_ANALYSIS_CHARS} char budget",
                text.chars().count()
            )));
        }

        let url = format!("{}/analyze", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&AnalyzeRequest { text })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalysisError::Timeout(self.timeout_secs)
                } else {
                    AnalysisError::UpstreamUnavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 413 {
            return Err(AnalysisError::TokenLimitExceeded(format!(
                "upstream rejected payload (status {status})"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::UpstreamUnavailable(format!(
                "status {status}: {body}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;
        if body.trim().is_empty() {
            return Err(AnalysisError::MalformedResponse("empty response body".into()));
        }

        // The model's output is unstructured by contract; non-JSON text
        // is passed through for the normalizer to absorb.
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}

/// Mock AI client for testing — returns a configurable response.
pub struct MockAiClient {
    response: Value,
    failure: Option<AnalysisError>,
}

impl MockAiClient {
    pub fn new(response: Value) -> Self {
        Self {
            response,
            failure: None,
        }
    }

    pub fn failing(failure: AnalysisError) -> Self {
        Self {
            response: Value::Null,
            failure: Some(failure),
        }
    }
}

#[async_trait]
impl AiClient for MockAiClient {
    async fn analyze(&self, _text: &str) -> Result<Value, AnalysisError> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(self.response.clone()),
        }
    }
}
