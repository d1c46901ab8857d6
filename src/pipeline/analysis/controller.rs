//! Analysis job controller — owns the lifecycle of one analysis
//! request: submission, status, progress, terminal result.
//!
//! `submit` never blocks on extraction or AI latency; the pipeline runs
//! on a background task. An in-flight guard keyed by the logical
//! subject prevents duplicate concurrent runs (and duplicate AI spend)
//! for the same subject.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::ai::AiClient;
use super::job::{
    AnalysisJob, PROGRESS_EXTRACTED, PROGRESS_NORMALIZED, PROGRESS_PAGES_END,
};
use super::store::JobStore;
use crate::config;
use crate::pipeline::extraction::{DocumentTextExtractor, ExtractionErrorKind};
use crate::pipeline::normalize::{aggregate_pages, normalize, CanonicalResult};

/// What the caller submits: a document, a manual text summary, or both.
#[derive(Debug, Clone, Default)]
pub struct AnalysisInput {
    pub document: Option<Vec<u8>>,
    pub manual_summary_text: Option<String>,
    /// The owning record (care plan, visit, …). Submissions sharing a
    /// subject are coalesced while one is in flight.
    pub subject_ref: Option<String>,
}

impl AnalysisInput {
    fn has_content(&self) -> bool {
        let has_document = self.document.as_ref().is_some_and(|d| !d.is_empty());
        let has_text = self
            .manual_summary_text
            .as_ref()
            .is_some_and(|t| !t.trim().is_empty());
        has_document || has_text
    }
}

/// Synchronous submission failures. Everything that happens after
/// acceptance is reported through the job record instead.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Owns job lifecycles. The single writer of job state.
pub struct AnalysisController {
    store: Arc<dyn JobStore>,
    ai: Arc<dyn AiClient>,
    extractor: DocumentTextExtractor,
    /// Subject → job currently running for it.
    in_flight: Mutex<HashMap<String, Uuid>>,
}

impl AnalysisController {
    pub fn new(store: Arc<dyn JobStore>, ai: Arc<dyn AiClient>) -> Arc<Self> {
        Arc::new(Self {
            store,
            ai,
            extractor: DocumentTextExtractor::new(),
            in_flight: Mutex::new(HashMap::new()),
        })
    }

    /// Accept an analysis request and return its job id immediately.
    ///
    /// Fails fast only on empty input. A submission for a subject that
    /// already has a run in flight attaches to the existing job rather
    /// than starting a second one.
    pub fn submit(self: &Arc<Self>, input: AnalysisInput) -> Result<Uuid, SubmitError> {
        if !input.has_content() {
            return Err(SubmitError::InvalidInput(
                "either a document or a manual text summary is required".into(),
            ));
        }

        // Anonymous submissions get a unique key: nothing to coalesce with.
        let subject = input
            .subject_ref
            .clone()
            .unwrap_or_else(|| format!("anonymous:{}", Uuid::new_v4()));

        let job_id = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(existing) = in_flight.get(&subject) {
                tracing::debug!(subject = %subject, job_id = %existing, "Coalescing into in-flight job");
                return Ok(*existing);
            }
            let job = self.store.create();
            in_flight.insert(subject.clone(), job.id);
            job.id
        };

        tracing::info!(job_id = %job_id, "Analysis job accepted");

        let controller = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(error) = controller.run_pipeline(job_id, input).await {
                tracing::warn!(job_id = %job_id, error = %error, "Analysis job failed");
                controller.store.fail(&job_id, error);
            }
            let mut in_flight = controller.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            in_flight.remove(&subject);
        });

        Ok(job_id)
    }

    /// Read-only snapshot for status watchers.
    pub fn get_status(&self, id: &Uuid) -> Option<AnalysisJob> {
        self.store.get(id)
    }

    /// Is a run currently in flight for this subject?
    pub fn is_in_flight(&self, subject: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(subject)
    }

    // ── Background pipeline ─────────────────────────────────

    async fn run_pipeline(&self, job_id: Uuid, input: AnalysisInput) -> Result<(), String> {
        // Structural rejects fail the job before it ever reaches
        // Processing; real extraction work starts the transition.
        if let Some(bytes) = &input.document {
            if bytes.len() < config::MIN_DOCUMENT_BYTES {
                return Err(format!(
                    "{}: {}",
                    ExtractionErrorKind::TooSmall,
                    ExtractionErrorKind::TooSmall.user_message()
                ));
            }
        }

        self.store.set_processing(&job_id);

        let pages: Vec<String> = match input.document {
            Some(bytes) => {
                let doc = self
                    .extractor
                    .extract(bytes)
                    .await
                    .map_err(|e| format!("{}: {}", e.kind, e.kind.user_message()))?;
                tracing::info!(
                    job_id = %job_id,
                    pages = doc.page_count(),
                    meaningful = doc.quality.contains_meaningful_text,
                    "Document extracted"
                );
                doc.pages.into_iter().map(|p| p.raw_text).collect()
            }
            None => {
                // Validated in submit: manual text is present.
                vec![input.manual_summary_text.unwrap_or_default()]
            }
        };
        self.store.set_progress(&job_id, PROGRESS_EXTRACTED);

        self.analyze_pages(job_id, pages).await
    }

    /// AI calls plus normalization; progress advances as pages complete.
    async fn analyze_pages(&self, job_id: Uuid, pages: Vec<String>) -> Result<(), String> {
        let (raw, canonical): (Value, CanonicalResult) = if pages.len() <= 1 {
            let text = pages.into_iter().next().unwrap_or_default();
            let raw = self.ai.analyze(&text).await.map_err(|e| e.to_string())?;
            let canonical = normalize(&raw);
            (raw, canonical)
        } else {
            let span = (PROGRESS_PAGES_END - PROGRESS_EXTRACTED) as usize;
            let total = pages.len();
            let mut raws: Vec<Value> = Vec::with_capacity(total);
            let mut page_results: Vec<CanonicalResult> = Vec::with_capacity(total);
            for (i, page) in pages.iter().enumerate() {
                let raw = self.ai.analyze(page).await.map_err(|e| e.to_string())?;
                page_results.push(normalize(&raw));
                raws.push(raw);
                let progress = PROGRESS_EXTRACTED + ((i + 1) * span / total) as u8;
                self.store.set_progress(&job_id, progress);
                tracing::debug!(job_id = %job_id, page = i + 1, total, "Page analyzed");
            }
            (Value::Array(raws), aggregate_pages(&page_results))
        };

        self.store.set_progress(&job_id, PROGRESS_NORMALIZED);
        self.store.save_final_result(&job_id, raw, canonical);
        tracing::info!(job_id = %job_id, "Analysis job completed");
        Ok(())
    }
}
