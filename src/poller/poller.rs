//! The polling task — one logical timer per active job.
//!
//! The task owns its whole lifecycle: it stops on terminal status, on
//! explicit `stop()`, or at the max-duration ceiling, whichever comes
//! first, and fires its terminal callback exactly once. Starting a
//! second poll for a job that already has one is a no-op.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::oneshot;
use uuid::Uuid;

use super::fallback::{DemoAnalysis, FallbackResultProvider};
use super::state::PollState;
use crate::api::types::JobStatusResponse;
use crate::config;
use crate::pipeline::analysis::JobStatus;
use crate::pipeline::normalize::{normalize, CanonicalResult};

/// Errors while querying job status.
#[derive(Debug, Error)]
pub enum PollError {
    /// The endpoint itself was unreachable (network, DNS, refused).
    #[error("Transport failure: {0}")]
    Transport(String),
    /// The endpoint answered with something undecodable.
    #[error("Undecodable status response: {0}")]
    Decode(String),
}

/// Where status snapshots come from (allows mocking the server).
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch(&self, job_id: &Uuid) -> Result<JobStatusResponse, PollError>;
}

/// Real source: `GET {base}/analysis-jobs/{id}/status`.
pub struct HttpStatusSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpStatusSource {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config::POLL_INTERVAL_SECS * 2))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch(&self, job_id: &Uuid) -> Result<JobStatusResponse, PollError> {
        let url = format!("{}/analysis-jobs/{job_id}/status", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PollError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PollError::Transport(format!(
                "status endpoint returned {}",
                response.status()
            )));
        }

        response
            .json::<JobStatusResponse>()
            .await
            .map_err(|e| PollError::Decode(e.to_string()))
    }
}

/// How one poll run ended.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// The job completed; the canonical result came from the server.
    Completed(CanonicalResult),
    /// The job failed; the server's error message.
    Failed(String),
    /// Transport kept failing; clearly-labeled local demo content.
    Demo(DemoAnalysis),
    /// The max poll duration ceiling was hit before a terminal state.
    Expired,
}

/// Poller tuning. Production values come from `config`; tests shrink
/// every interval.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_duration: Duration,
    /// Consecutive transport failures (with no real progress ever
    /// observed) before switching to the demo fallback.
    pub transport_failure_limit: u32,
    /// Pace of the simulated progression backing the demo fallback.
    pub simulated_step_delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(config::POLL_INTERVAL_SECS),
            max_duration: Duration::from_secs(config::MAX_POLL_DURATION_SECS),
            transport_failure_limit: 3,
            simulated_step_delay: Duration::from_secs(2),
        }
    }
}

/// Handle to a running poll task. Cancelling — via `stop()` or by
/// dropping the handle — skips the terminal callback: the consumer has
/// torn down interest.
pub struct PollerHandle {
    job_id: Uuid,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

impl PollerHandle {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Cancel polling. Idempotent.
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Wait for the poll task to wind down.
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

/// Spawns and tracks poll tasks, one per job at most.
pub struct StatusPoller {
    source: Arc<dyn StatusSource>,
    config: PollConfig,
    active: Arc<Mutex<HashSet<Uuid>>>,
}

impl StatusPoller {
    pub fn new(source: Arc<dyn StatusSource>, config: PollConfig) -> Self {
        Self {
            source,
            config,
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn is_active(&self, job_id: &Uuid) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(job_id)
    }

    /// Start polling a job. Returns `None` (a no-op) when a poll for
    /// this job is already active.
    ///
    /// `on_state` fires after every successful status read and during
    /// the simulated fallback; `on_terminal` fires exactly once, unless
    /// the consumer cancels first.
    pub fn start<F, G>(&self, job_id: Uuid, on_state: F, on_terminal: G) -> Option<PollerHandle>
    where
        F: Fn(&PollState) + Send + Sync + 'static,
        G: FnOnce(PollOutcome) + Send + 'static,
    {
        {
            let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
            if !active.insert(job_id) {
                tracing::debug!(job_id = %job_id, "Poll already active, ignoring start");
                return None;
            }
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let source = Arc::clone(&self.source);
        let config = self.config.clone();
        let active = Arc::clone(&self.active);

        let handle = tokio::spawn(async move {
            let outcome = poll_loop(source, config, job_id, &on_state, shutdown_rx).await;
            match outcome {
                Some(outcome) => on_terminal(outcome),
                None => tracing::debug!(job_id = %job_id, "Polling cancelled by consumer"),
            }
            active.lock().unwrap_or_else(|e| e.into_inner()).remove(&job_id);
        });

        Some(PollerHandle {
            job_id,
            shutdown_tx: Some(shutdown_tx),
            handle,
        })
    }
}

/// The poll loop proper. Returns `None` when cancelled (no terminal
/// callback), `Some(outcome)` otherwise.
async fn poll_loop(
    source: Arc<dyn StatusSource>,
    config: PollConfig,
    job_id: Uuid,
    on_state: &(dyn Fn(&PollState) + Sync),
    mut shutdown_rx: oneshot::Receiver<()>,
) -> Option<PollOutcome> {
    let started = tokio::time::Instant::now();
    let mut ticker = tokio::time::interval(config.interval);
    let mut state = PollState::new();
    let mut transport_failures = 0u32;
    let mut saw_real_progress = false;
    let mut completion_confirmed = false;

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                state.is_polling = false;
                return None;
            }
            _ = ticker.tick() => {}
        }

        if started.elapsed() >= config.max_duration {
            tracing::warn!(job_id = %job_id, "Poll duration ceiling reached");
            state.mark_error();
            state.is_polling = false;
            on_state(&state);
            return Some(PollOutcome::Expired);
        }

        match source.fetch(&job_id).await {
            Err(err) => {
                transport_failures += 1;
                tracing::warn!(
                    job_id = %job_id,
                    failures = transport_failures,
                    error = %err,
                    "Status poll failed"
                );
                if !saw_real_progress && transport_failures >= config.transport_failure_limit {
                    return simulate_locally(&mut state, on_state, &mut shutdown_rx, &config)
                        .await;
                }
            }
            Ok(snapshot) => {
                transport_failures = 0;
                saw_real_progress = true;
                state.apply_progress(snapshot.progress);

                match snapshot.status {
                    JobStatus::Failed => {
                        state.mark_error();
                        state.is_polling = false;
                        on_state(&state);
                        let error = snapshot
                            .error
                            .unwrap_or_else(|| "Analysis failed".to_string());
                        return Some(PollOutcome::Failed(error));
                    }
                    // Both conditions are required: a 100% reading with a
                    // non-terminal status (or a terminal flag with lagging
                    // progress) keeps polling. One confirmatory re-check
                    // guards against a transient 100% reading.
                    JobStatus::Completed if snapshot.progress == 100 => {
                        if completion_confirmed {
                            state.complete_all();
                            state.is_polling = false;
                            on_state(&state);
                            let data = snapshot
                                .data
                                .unwrap_or_else(|| normalize(&serde_json::Value::Null));
                            return Some(PollOutcome::Completed(data));
                        }
                        completion_confirmed = true;
                        on_state(&state);
                    }
                    _ => {
                        completion_confirmed = false;
                        on_state(&state);
                    }
                }
            }
        }
    }
}

/// Time-boxed local progression backing the demo fallback: advance the
/// four steps on a fixed cadence, then hand over demo content.
async fn simulate_locally(
    state: &mut PollState,
    on_state: &(dyn Fn(&PollState) + Sync),
    shutdown_rx: &mut oneshot::Receiver<()>,
    config: &PollConfig,
) -> Option<PollOutcome> {
    tracing::info!("Status endpoint unreachable, presenting demo fallback");
    for progress in [10u8, 40, 65, 90] {
        state.apply_progress(progress);
        on_state(state);
        tokio::select! {
            _ = &mut *shutdown_rx => {
                state.is_polling = false;
                return None;
            }
            _ = tokio::time::sleep(config.simulated_step_delay) => {}
        }
    }
    state.complete_all();
    state.is_polling = false;
    on_state(state);
    Some(PollOutcome::Demo(FallbackResultProvider::demo_result()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::state::StepStatus;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config() -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(5),
            max_duration: Duration::from_secs(10),
            transport_failure_limit: 3,
            simulated_step_delay: Duration::from_millis(2),
        }
    }

    fn response(status: JobStatus, progress: u8) -> JobStatusResponse {
        JobStatusResponse {
            status,
            progress,
            is_processing: status == JobStatus::Processing,
            data: None,
            message: match status {
                JobStatus::Pending => Some("initializing".to_string()),
                _ => None,
            },
            error: match status {
                JobStatus::Failed => Some("upstream unavailable".to_string()),
                _ => None,
            },
        }
    }

    /// Source that replays a script, repeating the last entry forever.
    struct ScriptedSource {
        script: Mutex<VecDeque<JobStatusResponse>>,
        last: Mutex<Option<JobStatusResponse>>,
        fetches: AtomicU32,
    }

    impl ScriptedSource {
        fn new(entries: Vec<JobStatusResponse>) -> Self {
            Self {
                script: Mutex::new(entries.into_iter().collect()),
                last: Mutex::new(None),
                fetches: AtomicU32::new(0),
            }
        }

        fn fetch_count(&self) -> u32 {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatusSource for ScriptedSource {
        async fn fetch(&self, _job_id: &Uuid) -> Result<JobStatusResponse, PollError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(entry) => {
                    *self.last.lock().unwrap() = Some(entry.clone());
                    Ok(entry)
                }
                None => self
                    .last
                    .lock()
                    .unwrap()
                    .clone()
                    .ok_or_else(|| PollError::Transport("script exhausted".into())),
            }
        }
    }

    /// Source that always fails at the transport level.
    struct DeadSource;

    #[async_trait]
    impl StatusSource for DeadSource {
        async fn fetch(&self, _job_id: &Uuid) -> Result<JobStatusResponse, PollError> {
            Err(PollError::Transport("connection refused".into()))
        }
    }

    struct Capture {
        states: Mutex<Vec<PollState>>,
        outcome: Mutex<Option<PollOutcome>>,
        terminal_calls: AtomicU32,
    }

    impl Capture {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                states: Mutex::new(Vec::new()),
                outcome: Mutex::new(None),
                terminal_calls: AtomicU32::new(0),
            })
        }
    }

    fn start_captured(
        poller: &StatusPoller,
        capture: &Arc<Capture>,
        job_id: Uuid,
    ) -> Option<PollerHandle> {
        let states = Arc::clone(capture);
        let terminal = Arc::clone(capture);
        poller.start(
            job_id,
            move |state| states.states.lock().unwrap().push(state.clone()),
            move |outcome| {
                terminal.terminal_calls.fetch_add(1, Ordering::SeqCst);
                *terminal.outcome.lock().unwrap() = Some(outcome);
            },
        )
    }

    #[tokio::test]
    async fn progress_sequence_completes_all_steps_and_fires_once() {
        let source = Arc::new(ScriptedSource::new(vec![
            response(JobStatus::Pending, 10),
            response(JobStatus::Processing, 60),
            response(JobStatus::Completed, 100),
        ]));
        let poller = StatusPoller::new(source.clone(), fast_config());
        let capture = Capture::new();
        let handle = start_captured(&poller, &capture, Uuid::new_v4()).unwrap();
        handle.join().await;

        let final_state = capture.states.lock().unwrap().last().cloned().unwrap();
        assert_eq!(final_state.step_statuses, [StepStatus::Completed; 4]);
        assert!(!final_state.is_polling);
        assert_eq!(capture.terminal_calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            capture.outcome.lock().unwrap().as_ref(),
            Some(PollOutcome::Completed(_))
        ));
        // Script plus exactly one confirmatory re-check.
        assert_eq!(source.fetch_count(), 4);
    }

    #[tokio::test]
    async fn pending_at_zero_progress_is_never_completion() {
        let source = Arc::new(ScriptedSource::new(vec![
            response(JobStatus::Pending, 0),
            response(JobStatus::Pending, 0),
            response(JobStatus::Completed, 100),
            response(JobStatus::Completed, 100),
        ]));
        let poller = StatusPoller::new(source, fast_config());
        let capture = Capture::new();
        let handle = start_captured(&poller, &capture, Uuid::new_v4()).unwrap();
        handle.join().await;

        let states = capture.states.lock().unwrap();
        // The first observed states must still be in step 0, not completed.
        assert_eq!(states[0].step_statuses[0], StepStatus::Processing);
        assert_eq!(states[0].step_statuses[3], StepStatus::Waiting);
        assert_eq!(capture.terminal_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_100_without_terminal_status_keeps_polling() {
        let source = Arc::new(ScriptedSource::new(vec![
            // Progress hits 100 while the server still says processing.
            response(JobStatus::Processing, 100),
            response(JobStatus::Processing, 100),
            response(JobStatus::Completed, 100),
        ]));
        let poller = StatusPoller::new(source.clone(), fast_config());
        let capture = Capture::new();
        let handle = start_captured(&poller, &capture, Uuid::new_v4()).unwrap();
        handle.join().await;

        assert!(matches!(
            capture.outcome.lock().unwrap().as_ref(),
            Some(PollOutcome::Completed(_))
        ));
        // Two processing reads + completed + confirmatory re-check.
        assert_eq!(source.fetch_count(), 4);
    }

    #[tokio::test]
    async fn failed_job_stops_polling_and_surfaces_error() {
        let source = Arc::new(ScriptedSource::new(vec![
            response(JobStatus::Processing, 30),
            response(JobStatus::Failed, 30),
        ]));
        let poller = StatusPoller::new(source.clone(), fast_config());
        let capture = Capture::new();
        let handle = start_captured(&poller, &capture, Uuid::new_v4()).unwrap();
        handle.join().await;

        match capture.outcome.lock().unwrap().as_ref() {
            Some(PollOutcome::Failed(error)) => assert_eq!(error, "upstream unavailable"),
            other => panic!("expected Failed outcome, got {other:?}"),
        }
        let final_state = capture.states.lock().unwrap().last().cloned().unwrap();
        assert_eq!(final_state.step_statuses[1], StepStatus::Error);
        // No retry storm: polling stopped at the failure read.
        assert_eq!(source.fetch_count(), 2);
        assert_eq!(capture.terminal_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transport_failures_fall_back_to_demo() {
        let poller = StatusPoller::new(Arc::new(DeadSource), fast_config());
        let capture = Capture::new();
        let handle = start_captured(&poller, &capture, Uuid::new_v4()).unwrap();
        handle.join().await;

        match capture.outcome.lock().unwrap().as_ref() {
            Some(PollOutcome::Demo(demo)) => assert!(demo.is_demo),
            other => panic!("expected Demo outcome, got {other:?}"),
        }
        let final_state = capture.states.lock().unwrap().last().cloned().unwrap();
        assert_eq!(final_state.step_statuses, [StepStatus::Completed; 4]);
    }

    #[tokio::test]
    async fn transport_blip_after_real_progress_does_not_demo() {
        let config = PollConfig {
            max_duration: Duration::from_millis(120),
            ..fast_config()
        };
        // One real progress read, then transport errors forever.
        struct BlipSource {
            first: Mutex<bool>,
        }
        #[async_trait]
        impl StatusSource for BlipSource {
            async fn fetch(&self, _job_id: &Uuid) -> Result<JobStatusResponse, PollError> {
                let mut first = self.first.lock().unwrap();
                if *first {
                    *first = false;
                    Ok(JobStatusResponse {
                        status: JobStatus::Processing,
                        progress: 30,
                        is_processing: true,
                        data: None,
                        message: None,
                        error: None,
                    })
                } else {
                    Err(PollError::Transport("blip".into()))
                }
            }
        }
        let poller = StatusPoller::new(
            Arc::new(BlipSource {
                first: Mutex::new(true),
            }),
            config,
        );
        let capture = Capture::new();
        let handle = start_captured(&poller, &capture, Uuid::new_v4()).unwrap();
        handle.join().await;

        // Progress was observed, so the poller must never substitute demo
        // content; it polls until the ceiling expires instead.
        assert!(matches!(
            capture.outcome.lock().unwrap().as_ref(),
            Some(PollOutcome::Expired)
        ));
    }

    #[tokio::test]
    async fn duration_ceiling_expires_the_poll() {
        let source = Arc::new(ScriptedSource::new(vec![response(JobStatus::Processing, 40)]));
        let config = PollConfig {
            max_duration: Duration::from_millis(50),
            ..fast_config()
        };
        let poller = StatusPoller::new(source, config);
        let capture = Capture::new();
        let handle = start_captured(&poller, &capture, Uuid::new_v4()).unwrap();
        handle.join().await;

        assert!(matches!(
            capture.outcome.lock().unwrap().as_ref(),
            Some(PollOutcome::Expired)
        ));
        assert_eq!(capture.terminal_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn start_is_idempotent_per_job() {
        let source = Arc::new(ScriptedSource::new(vec![response(JobStatus::Processing, 10)]));
        let poller = StatusPoller::new(source, fast_config());
        let capture = Capture::new();
        let job_id = Uuid::new_v4();

        let mut first = start_captured(&poller, &capture, job_id).unwrap();
        assert!(poller.is_active(&job_id));
        assert!(start_captured(&poller, &capture, job_id).is_none());

        first.stop();
        first.join().await;
        assert!(!poller.is_active(&job_id));
    }

    #[tokio::test]
    async fn stop_cancels_without_terminal_callback() {
        let source = Arc::new(ScriptedSource::new(vec![response(JobStatus::Processing, 10)]));
        let poller = StatusPoller::new(source, fast_config());
        let capture = Capture::new();
        let mut handle = start_captured(&poller, &capture, Uuid::new_v4()).unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.stop();
        handle.join().await;

        assert_eq!(capture.terminal_calls.load(Ordering::SeqCst), 0);
        assert!(capture.outcome.lock().unwrap().is_none());
    }
}
