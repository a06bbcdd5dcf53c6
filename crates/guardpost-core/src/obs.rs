//! Structured observability hooks for pipeline run lifecycle events.
//!
//! Emission functions keep the field names stable so log pipelines can key
//! on `event` + `finding_id` without parsing message text.

use tracing::info;

use crate::domain::RunState;

/// RAII guard that enters a run-scoped tracing span for the duration of a
/// pipeline run.
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    /// Create and enter a span tagged with the finding id driving this run.
    pub fn enter(finding_id: &str) -> Self {
        let span = tracing::info_span!("guardpost.run", finding_id = %finding_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: the run moved to a new state.
pub fn emit_state(finding_id: &str, state: RunState) {
    info!(event = "run.state", finding_id = %finding_id, state = %state);
}

/// Emit event: the run reached a successful terminal state.
pub fn emit_run_finished(finding_id: &str, state: RunState) {
    info!(event = "run.finished", finding_id = %finding_id, state = %state);
}

/// Emit event: the run failed (error level).
pub fn emit_run_failed(finding_id: &str, error: &dyn std::fmt::Display) {
    tracing::error!(event = "run.failed", finding_id = %finding_id, error = %error);
}
