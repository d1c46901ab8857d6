//! The four-step visual state machine, derived from job progress.

use serde::{Deserialize, Serialize};

/// Display labels for the four analysis steps, in order.
pub const ANALYSIS_STEPS: [&str; 4] = [
    "Reading document text",
    "Identifying out-of-range values",
    "Matching clinical patterns",
    "Preparing recommendations",
];

/// Substate of one visual step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Waiting,
    Processing,
    Completed,
    Error,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

/// Derived client-side view of a running analysis. Never persisted;
/// discarded when the job reaches a terminal state or the consumer
/// cancels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollState {
    pub step_index: usize,
    pub step_statuses: [StepStatus; 4],
    pub is_polling: bool,
}

impl PollState {
    pub fn new() -> Self {
        Self {
            step_index: 0,
            step_statuses: [StepStatus::Waiting; 4],
            is_polling: true,
        }
    }

    /// Map a 0–100 progress reading onto the four quartile steps.
    ///
    /// 100 marks every step completed but does NOT by itself mean the
    /// job is done — completion additionally requires a terminal job
    /// status (see the poller loop).
    pub fn apply_progress(&mut self, progress: u8) {
        let progress = progress.min(100);
        if progress == 100 {
            self.complete_all();
            return;
        }
        let active = match progress {
            0..=25 => 0,
            26..=50 => 1,
            51..=75 => 2,
            _ => 3,
        };
        for (i, slot) in self.step_statuses.iter_mut().enumerate() {
            *slot = match i.cmp(&active) {
                std::cmp::Ordering::Less => StepStatus::Completed,
                std::cmp::Ordering::Equal => StepStatus::Processing,
                std::cmp::Ordering::Greater => StepStatus::Waiting,
            };
        }
        self.step_index = active;
    }

    pub fn complete_all(&mut self) {
        self.step_statuses = [StepStatus::Completed; 4];
        self.step_index = ANALYSIS_STEPS.len() - 1;
    }

    /// Mark the currently active step as errored.
    pub fn mark_error(&mut self) {
        self.step_statuses[self.step_index] = StepStatus::Error;
    }
}

impl Default for PollState {
    fn default() -> Self {
        Self::new()
    }
}
