//! Run lifecycle: states, terminal outcomes, and the host result payload.

use serde::{Deserialize, Serialize};

/// Lifecycle states of one pipeline run.
///
/// `Skipped`, `Rescheduled`, `Done`, and `Failed` are terminal; `Failed` is
/// reachable from any state on an unhandled error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunState {
    Received,
    Skipped,
    Enriching,
    Analyzing,
    Rescheduled,
    Rendering,
    Publishing,
    Done,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Skipped | RunState::Rescheduled | RunState::Done | RunState::Failed
        )
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunState::Received => "RECEIVED",
            RunState::Skipped => "SKIPPED",
            RunState::Enriching => "ENRICHING",
            RunState::Analyzing => "ANALYZING",
            RunState::Rescheduled => "RESCHEDULED",
            RunState::Rendering => "RENDERING",
            RunState::Publishing => "PUBLISHING",
            RunState::Done => "DONE",
            RunState::Failed => "FAILED",
        };
        write!(f, "{}", name)
    }
}

/// Successful terminal outcome of a run.
///
/// All three report success to the host; the body text distinguishes
/// "fully processed" from "intentionally deferred" from "intentionally
/// ignored" for operators.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Report stored and notification sent.
    Completed { analysis: String },

    /// Severity below threshold; nothing was called downstream.
    Skipped { reason: String },

    /// The analysis capability throttled the run and a one-shot replay was
    /// registered instead.
    Rescheduled { rule_name: String, delay_secs: i64 },
}

impl RunOutcome {
    /// The terminal state this outcome lands in.
    pub fn terminal_state(&self) -> RunState {
        match self {
            RunOutcome::Completed { .. } => RunState::Done,
            RunOutcome::Skipped { .. } => RunState::Skipped,
            RunOutcome::Rescheduled { .. } => RunState::Rescheduled,
        }
    }
}

/// The status/result payload handed back to the invoking platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunResult {
    pub status: u16,
    pub body: String,
}

impl RunResult {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn error(body: impl Into<String>) -> Self {
        Self {
            status: 500,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}
