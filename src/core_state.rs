//! Process-level application state.
//!
//! One explicitly constructed service object, built by the entry point
//! and shared via `Arc`. Nothing in here is lazily initialized on
//! first call — construction order and teardown are owned by `main`.

use std::sync::Arc;

use crate::config::RuntimeConfig;
use crate::pipeline::analysis::{
    AiClient, AnalysisController, HttpAiClient, InMemoryJobStore, JobStore,
};

/// Shared state between the HTTP surface and the pipeline.
pub struct CoreState {
    pub controller: Arc<AnalysisController>,
    pub config: RuntimeConfig,
}

impl CoreState {
    /// Production wiring: in-memory job store + HTTP AI client.
    pub fn new(config: RuntimeConfig) -> Self {
        let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        let ai: Arc<dyn AiClient> = Arc::new(HttpAiClient::from_config(&config));
        Self {
            controller: AnalysisController::new(store, ai),
            config,
        }
    }

    /// Custom wiring for tests (mock AI, shared store).
    pub fn with_parts(config: RuntimeConfig, store: Arc<dyn JobStore>, ai: Arc<dyn AiClient>) -> Self {
        Self {
            controller: AnalysisController::new(store, ai),
            config,
        }
    }
}
