//! The finding enrichment pipeline orchestrator.
//!
//! One `Pipeline` sequences a run through validate → fetch → gate → enrich
//! → analyze → (reschedule on throttle) → render → publish → retry cleanup,
//! and maps every exit to a status/result payload for the invoking
//! platform. Runs are independent; the pipeline holds no mutable state
//! across them.

use std::sync::Arc;

use chrono::Utc;
use guardpost_capabilities::{
    AnalysisModel, FindingSource, GraphSource, NotificationBus, ObjectStore, OneShotScheduler,
};
use tracing::info;

use crate::analysis::{AnalysisInvoker, AnalysisOutcome};
use crate::config::PipelineConfig;
use crate::domain::{Result, RunOutcome, RunResult, RunState, TriggerEvent};
use crate::enrichment::EnrichmentReader;
use crate::gate::{evaluate_gate, GateDecision};
use crate::metrics::METRICS;
use crate::obs;
use crate::publish::Publisher;
use crate::report::Report;
use crate::retry::RetryScheduler;

/// External collaborators handed to the pipeline at construction.
pub struct Collaborators {
    pub findings: Arc<dyn FindingSource>,
    pub graph: Arc<dyn GraphSource>,
    pub model: Arc<dyn AnalysisModel>,
    pub store: Arc<dyn ObjectStore>,
    pub bus: Arc<dyn NotificationBus>,
    pub scheduler: Arc<dyn OneShotScheduler>,
}

/// One pipeline instance, reusable across any number of independent runs.
pub struct Pipeline {
    enrichment: EnrichmentReader,
    invoker: AnalysisInvoker,
    retry: RetryScheduler,
    publisher: Publisher,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, collaborators: Collaborators) -> Self {
        Self {
            enrichment: EnrichmentReader::new(collaborators.findings, collaborators.graph),
            invoker: AnalysisInvoker::new(collaborators.model, config.generation.clone()),
            retry: RetryScheduler::new(collaborators.scheduler),
            publisher: Publisher::new(collaborators.store, collaborators.bus, &config.topic),
        }
    }

    /// Execute one run. Always returns a result payload: fatal errors are
    /// mapped to a 500 carrying the error description, every intentional
    /// exit to a 200 with a distinguishing body.
    pub async fn run(&self, event: &TriggerEvent) -> RunResult {
        let _span = obs::RunSpan::enter(event.finding_id());
        match self.run_inner(event).await {
            Ok(outcome) => {
                let state = outcome.terminal_state();
                match state {
                    RunState::Done => METRICS.inc_completed(),
                    RunState::Skipped => METRICS.inc_skipped(),
                    RunState::Rescheduled => METRICS.inc_rescheduled(),
                    _ => {}
                }
                obs::emit_run_finished(event.finding_id(), state);
                match outcome {
                    RunOutcome::Completed { analysis } => RunResult::ok(analysis),
                    RunOutcome::Skipped { reason } => RunResult::ok(reason),
                    RunOutcome::Rescheduled { .. } => RunResult::ok("Event scheduled."),
                }
            }
            Err(err) => {
                METRICS.inc_failed();
                obs::emit_run_failed(event.finding_id(), &err);
                RunResult::error(format!("Error in processing: {}", err))
            }
        }
    }

    async fn run_inner(&self, event: &TriggerEvent) -> Result<RunOutcome> {
        obs::emit_state(event.finding_id(), RunState::Received);
        event.validate()?;

        let finding = self
            .enrichment
            .fetch_finding(event.detector_id(), event.finding_id())
            .await?;

        if let GateDecision::Skip { reason } = evaluate_gate(&finding) {
            info!(severity = finding.severity, "below severity threshold");
            return Ok(RunOutcome::Skipped { reason });
        }

        obs::emit_state(event.finding_id(), RunState::Enriching);
        let account = finding
            .account_id
            .clone()
            .unwrap_or_else(|| event.account.clone());
        let entities = self.enrichment.fetch_entities(&account).await?;

        obs::emit_state(event.finding_id(), RunState::Analyzing);
        let analysis = match self.invoker.analyze(&finding, &entities).await? {
            AnalysisOutcome::Text(text) => text,
            AnalysisOutcome::Throttled => {
                let scheduled = self.retry.schedule(event).await?;
                return Ok(RunOutcome::Rescheduled {
                    rule_name: scheduled.rule_name,
                    delay_secs: scheduled.delay_secs,
                });
            }
        };

        obs::emit_state(event.finding_id(), RunState::Rendering);
        let report = Report::build(&finding, &analysis, Utc::now());

        obs::emit_state(event.finding_id(), RunState::Publishing);
        self.publisher
            .publish(&report.to_bytes(), event.finding_id())
            .await?;

        // A successfully replayed run deletes the schedule that fired it.
        // Cancellation is best-effort and cannot demote the run.
        if let Some(rule_name) = event.retry_rule_name() {
            self.retry.cancel(rule_name).await;
        }

        Ok(RunOutcome::Completed { analysis })
    }
}
