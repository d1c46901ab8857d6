//! Application-level constants and runtime configuration.

use std::net::SocketAddr;

pub const APP_NAME: &str = "Clinsight";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is not set.
pub fn default_log_filter() -> String {
    format!("{}=info,tower_http=warn", env!("CARGO_PKG_NAME"))
}

// ── Upload boundary ─────────────────────────────────────────

/// Maximum accepted upload size (10 MB), enforced before extraction.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Inputs below this size cannot be a real document.
pub const MIN_DOCUMENT_BYTES: usize = 100;

// ── Pipeline timeouts ───────────────────────────────────────

/// Hard wall-clock limit for text extraction.
pub const EXTRACTION_TIMEOUT_SECS: u64 = 30;

/// Per-request limit for the AI analysis call. Distinct from the
/// extraction timeout: model latency dominates on long documents.
pub const AI_TIMEOUT_SECS: u64 = 120;

// ── Client polling ──────────────────────────────────────────

/// Fixed polling cadence while a job is non-terminal.
pub const POLL_INTERVAL_SECS: u64 = 3;

/// No poll timer runs past this ceiling.
pub const MAX_POLL_DURATION_SECS: u64 = 300;

// ── Runtime configuration ───────────────────────────────────

/// Process-level configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Base URL of the AI analysis collaborator.
    pub ai_base_url: String,
    /// Address the HTTP API binds to.
    pub bind_addr: SocketAddr,
}

impl RuntimeConfig {
    /// Resolve configuration from environment variables, with local defaults.
    ///
    /// `CLINSIGHT_AI_URL` — AI collaborator endpoint (default local stub port).
    /// `CLINSIGHT_BIND` — listen address (default 127.0.0.1:8787).
    pub fn from_env() -> Self {
        let ai_base_url = std::env::var("CLINSIGHT_AI_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());
        let bind_addr = std::env::var("CLINSIGHT_BIND")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| "127.0.0.1:8787".parse().expect("static default address"));
        Self {
            ai_base_url,
            bind_addr,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
