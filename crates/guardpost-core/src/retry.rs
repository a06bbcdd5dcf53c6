//! One-shot retry scheduling for throttled runs.
//!
//! When the analysis capability throttles a run, the pipeline does not
//! retry synchronously. It registers a single future replay of the original
//! trigger at a random delay and exits successfully; the replayed run
//! deletes its own schedule once it completes.

use std::sync::Arc;

use chrono::{Duration, Utc};
use guardpost_capabilities::OneShotScheduler;
use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{PipelineError, Result, TriggerEvent};

/// Inclusive bounds for the random retry delay, in seconds.
pub const MIN_DELAY_SECS: i64 = 1;
pub const MAX_DELAY_SECS: i64 = 600;

const RULE_PREFIX: &str = "retry-";

/// A registered one-shot replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledRetry {
    pub rule_name: String,
    pub delay_secs: i64,
}

pub struct RetryScheduler {
    scheduler: Arc<dyn OneShotScheduler>,
}

impl RetryScheduler {
    pub fn new(scheduler: Arc<dyn OneShotScheduler>) -> Self {
        Self { scheduler }
    }

    /// Register a one-shot replay of `event` at a uniformly random delay in
    /// `[MIN_DELAY_SECS, MAX_DELAY_SECS]`.
    ///
    /// The replay payload is a full copy of the original trigger annotated
    /// with the new rule name, so the retried run can re-derive the finding
    /// and clean up after itself. Each registration gets a fresh name;
    /// nothing deduplicates schedules for the same logical retry.
    ///
    /// A registration failure surfaces as `RetryNotScheduled` — answering
    /// "rescheduled" without a registered replay would drop the finding.
    pub async fn schedule(&self, event: &TriggerEvent) -> Result<ScheduledRetry> {
        let delay_secs = pick_delay(&mut rand::thread_rng());
        let when = Utc::now() + Duration::seconds(delay_secs);
        let rule_name = format!("{}{}", RULE_PREFIX, Uuid::new_v4());
        let replay = serde_json::to_value(event.replay_with_marker(&rule_name))?;

        info!(rule = %rule_name, delay_secs, "scheduling one-shot retry");
        self.scheduler
            .create_one_shot(&rule_name, when, &replay)
            .await
            .map_err(PipelineError::RetryNotScheduled)?;

        Ok(ScheduledRetry {
            rule_name,
            delay_secs,
        })
    }

    /// Best-effort removal of a previously created retry schedule.
    ///
    /// A leaked schedule only causes one extra, redundant run, so failures
    /// are logged and swallowed rather than demoting a successful run.
    pub async fn cancel(&self, rule_name: &str) {
        info!(rule = %rule_name, "removing retry schedule");
        if let Err(err) = self.scheduler.delete_one_shot(rule_name).await {
            warn!(rule = %rule_name, error = %err, "failed to remove retry schedule");
        }
    }
}

fn pick_delay<R: Rng>(rng: &mut R) -> i64 {
    rng.gen_range(MIN_DELAY_SECS..=MAX_DELAY_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use guardpost_capabilities::fakes::FakeOneShotScheduler;
    use serde_json::json;

    fn sample_event() -> TriggerEvent {
        serde_json::from_value(json!({
            "account": "111122223333",
            "region": "us-east-1",
            "detail": {
                "schemaVersion": "2.0",
                "partition": "aws",
                "id": "F1",
                "service": { "detectorId": "det-1" }
            }
        }))
        .unwrap()
    }

    #[test]
    fn delay_stays_within_inclusive_bounds() {
        let mut rng = rand::thread_rng();
        for _ in 0..10_000 {
            let delay = pick_delay(&mut rng);
            assert!((MIN_DELAY_SECS..=MAX_DELAY_SECS).contains(&delay));
        }
    }

    #[tokio::test]
    async fn schedule_registers_a_marked_full_replay() {
        let fake = Arc::new(FakeOneShotScheduler::new());
        let retry = RetryScheduler::new(fake.clone());
        let before = Utc::now();

        let scheduled = retry.schedule(&sample_event()).await.unwrap();
        assert!(scheduled.rule_name.starts_with("retry-"));
        assert!((MIN_DELAY_SECS..=MAX_DELAY_SECS).contains(&scheduled.delay_secs));

        let created = fake.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].name, scheduled.rule_name);
        assert!(created[0].when >= before + Duration::seconds(MIN_DELAY_SECS));
        assert!(created[0].when <= Utc::now() + Duration::seconds(MAX_DELAY_SECS));

        let replay = &created[0].replay;
        assert_eq!(replay["detail"]["retryRuleName"], scheduled.rule_name);
        assert_eq!(replay["detail"]["id"], "F1");
        assert_eq!(replay["detail"]["service"]["detectorId"], "det-1");
        assert_eq!(replay["detail"]["schemaVersion"], "2.0");
        assert_eq!(replay["detail"]["partition"], "aws");
        assert_eq!(replay["account"], "111122223333");
        assert_eq!(replay["region"], "us-east-1");
    }

    #[tokio::test]
    async fn each_schedule_gets_a_fresh_name() {
        let fake = Arc::new(FakeOneShotScheduler::new());
        let retry = RetryScheduler::new(fake.clone());

        let first = retry.schedule(&sample_event()).await.unwrap();
        let second = retry.schedule(&sample_event()).await.unwrap();
        assert_ne!(first.rule_name, second.rule_name);
        assert_eq!(fake.created().len(), 2);
    }

    #[tokio::test]
    async fn registration_failure_surfaces_as_retry_not_scheduled() {
        let retry = RetryScheduler::new(Arc::new(FakeOneShotScheduler::failing_create(
            "rule limit reached",
        )));
        let err = retry.schedule(&sample_event()).await.unwrap_err();
        assert!(matches!(err, PipelineError::RetryNotScheduled(_)));
    }

    #[tokio::test]
    async fn cancel_swallows_deletion_failure() {
        let retry = RetryScheduler::new(Arc::new(FakeOneShotScheduler::failing_delete(
            "already gone",
        )));
        // Must not panic or propagate.
        retry.cancel("retry-abc").await;
    }

    #[tokio::test]
    async fn cancel_deletes_the_exact_name() {
        let fake = Arc::new(FakeOneShotScheduler::new());
        let retry = RetryScheduler::new(fake.clone());
        retry.cancel("retry-123").await;
        assert_eq!(fake.deleted(), vec!["retry-123"]);
    }
}
