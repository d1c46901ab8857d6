//! Job persistence behind a trait.
//!
//! The external record store is out of scope; `InMemoryJobStore` stands
//! in for it. The store enforces the lifecycle invariants so no caller
//! can regress progress or overwrite a terminal job.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use super::job::{AnalysisJob, JobStatus, PROGRESS_DONE};
use crate::pipeline::normalize::CanonicalResult;

/// Persistence contract for analysis jobs.
///
/// Single-writer discipline: only the controller calls the mutating
/// methods. Readers take snapshots via `get`; a stale-but-consistent
/// read is always safe because fields only transition forward.
pub trait JobStore: Send + Sync {
    /// Create a new job in Pending and return a snapshot of it.
    fn create(&self) -> AnalysisJob;

    /// Read-only snapshot.
    fn get(&self, id: &Uuid) -> Option<AnalysisJob>;

    /// Pending → Processing. No-op on terminal jobs.
    fn set_processing(&self, id: &Uuid);

    /// Raise progress. Monotonic: lower values are ignored, and values
    /// are capped below 100 while the job is non-terminal so progress
    /// reaches 100 if and only if the job completes.
    fn set_progress(&self, id: &Uuid, progress: u8);

    /// Persist the final result and complete the job. Idempotent:
    /// the first call wins, later calls are no-ops. Returns whether
    /// this call was the winning one.
    fn save_final_result(&self, id: &Uuid, raw: Value, canonical: CanonicalResult) -> bool;

    /// Fail the job with a descriptive error. First terminal transition
    /// wins, as with `save_final_result`.
    fn fail(&self, id: &Uuid, error: String) -> bool;
}

/// In-memory store used both in production (record store is assumed
/// external) and in tests.
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<Uuid, AnalysisJob>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStore for InMemoryJobStore {
    fn create(&self) -> AnalysisJob {
        let job = AnalysisJob::new();
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        jobs.insert(job.id, job.clone());
        job
    }

    fn get(&self, id: &Uuid) -> Option<AnalysisJob> {
        let jobs = self.jobs.read().unwrap_or_else(|e| e.into_inner());
        jobs.get(id).cloned()
    }

    fn set_processing(&self, id: &Uuid) {
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        if let Some(job) = jobs.get_mut(id) {
            if !job.status.is_terminal() {
                job.status = JobStatus::Processing;
                job.updated_at = Utc::now();
            }
        }
    }

    fn set_progress(&self, id: &Uuid, progress: u8) {
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        if let Some(job) = jobs.get_mut(id) {
            if job.status.is_terminal() {
                return;
            }
            let capped = progress.min(PROGRESS_DONE - 1);
            if capped > job.progress {
                job.progress = capped;
                job.updated_at = Utc::now();
            }
        }
    }

    fn save_final_result(&self, id: &Uuid, raw: Value, canonical: CanonicalResult) -> bool {
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        let Some(job) = jobs.get_mut(id) else {
            return false;
        };
        if job.status.is_terminal() {
            return false;
        }
        job.status = JobStatus::Completed;
        job.progress = PROGRESS_DONE;
        job.raw_result = Some(raw);
        job.canonical_result = Some(canonical);
        job.updated_at = Utc::now();
        true
    }

    fn fail(&self, id: &Uuid, error: String) -> bool {
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        let Some(job) = jobs.get_mut(id) else {
            return false;
        };
        if job.status.is_terminal() {
            return false;
        }
        job.status = JobStatus::Failed;
        job.error = Some(error);
        job.updated_at = Utc::now();
        true
    }
}
