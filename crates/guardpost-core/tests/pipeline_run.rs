//! End-to-end pipeline runs against the in-memory capability fakes.
//!
//! Covers the call-count properties (who gets called, exactly how often,
//! per terminal outcome) and the error propagation rules.

use std::sync::Arc;

use guardpost_capabilities::fakes::*;
use guardpost_capabilities::{EntityRecord, Finding};
use guardpost_core::{Collaborators, Pipeline, PipelineConfig, TriggerEvent};
use serde_json::json;

const ANALYSIS_TEXT: &str = "Analysis:\nBreach detected.\n\nRemediation Actions:\nRotate keys.";

struct Harness {
    findings: Arc<FakeFindingSource>,
    graph: Arc<FakeGraphSource>,
    model: Arc<FakeAnalysisModel>,
    store: Arc<FakeObjectStore>,
    bus: Arc<FakeNotificationBus>,
    scheduler: Arc<FakeOneShotScheduler>,
    pipeline: Pipeline,
}

fn build(
    findings: FakeFindingSource,
    graph: FakeGraphSource,
    model: FakeAnalysisModel,
    store: FakeObjectStore,
    bus: FakeNotificationBus,
    scheduler: FakeOneShotScheduler,
) -> Harness {
    let findings = Arc::new(findings);
    let graph = Arc::new(graph);
    let model = Arc::new(model);
    let store = Arc::new(store);
    let bus = Arc::new(bus);
    let scheduler = Arc::new(scheduler);

    let pipeline = Pipeline::new(
        PipelineConfig::new("reports-bucket", "arn:topic:reports"),
        Collaborators {
            findings: findings.clone(),
            graph: graph.clone(),
            model: model.clone(),
            store: store.clone(),
            bus: bus.clone(),
            scheduler: scheduler.clone(),
        },
    );

    Harness {
        findings,
        graph,
        model,
        store,
        bus,
        scheduler,
        pipeline,
    }
}

fn sample_finding(severity: f64) -> Finding {
    Finding {
        id: "F1".to_string(),
        severity,
        finding_type: Some("UnauthorizedAccess:EC2/SSHBruteForce".to_string()),
        account_id: Some("A1".to_string()),
        region: Some("us-east-1".to_string()),
        detail: json!({ "Service": { "Count": 3.0 } }),
    }
}

fn one_member_graph() -> FakeGraphSource {
    FakeGraphSource::new(
        vec!["arn:graph/one".to_string()],
        vec![EntityRecord {
            account_id: "A1".to_string(),
            attributes: json!({ "Status": "ENABLED" }),
        }],
    )
}

fn happy_harness(severity: f64) -> Harness {
    build(
        FakeFindingSource::with_finding("det-1", sample_finding(severity)),
        one_member_graph(),
        FakeAnalysisModel::respond_with(ANALYSIS_TEXT),
        FakeObjectStore::new(),
        FakeNotificationBus::new(),
        FakeOneShotScheduler::new(),
    )
}

fn trigger(finding_id: &str) -> TriggerEvent {
    serde_json::from_value(json!({
        "version": "0",
        "id": "evt-1",
        "detail-type": "GuardDuty Finding",
        "source": "aws.guardduty",
        "account": "111122223333",
        "time": "2026-08-06T10:00:00Z",
        "region": "us-east-1",
        "detail": {
            "schemaVersion": "2.0",
            "partition": "aws",
            "id": finding_id,
            "service": { "detectorId": "det-1" }
        }
    }))
    .unwrap()
}

fn trigger_with_marker(finding_id: &str, rule_name: &str) -> TriggerEvent {
    let mut event = trigger(finding_id);
    event.detail.retry_rule_name = Some(rule_name.to_string());
    event
}

// ── Full flow ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn high_severity_finding_flows_end_to_end() {
    let h = happy_harness(6.0);
    let result = h.pipeline.run(&trigger("F1")).await;

    assert_eq!(result.status, 200);
    assert_eq!(result.body, ANALYSIS_TEXT);

    // Enrichment and analysis exactly once each.
    assert_eq!(h.findings.call_count(), 1);
    assert_eq!(h.graph.graph_call_count(), 1);
    assert_eq!(h.graph.entity_call_count(), 1);
    assert_eq!(h.model.call_count(), 1);

    // One artifact under the deterministic key, one notification, no
    // schedule activity.
    assert_eq!(h.store.put_count(), 1);
    assert!(h.store.object("F1.md").is_some());
    assert_eq!(h.bus.call_count(), 1);
    assert!(h.scheduler.created().is_empty());
    assert!(h.scheduler.deleted().is_empty());
}

#[tokio::test]
async fn rendered_report_has_headings_followed_by_their_body_lines() {
    let h = happy_harness(6.0);
    h.pipeline.run(&trigger("F1")).await;

    let stored = h.store.object("F1.md").unwrap();
    assert_eq!(stored.content_type, "text/markdown");

    let text = String::from_utf8(stored.bytes).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    let analysis = lines.iter().position(|l| *l == "### Analysis:").unwrap();
    assert_eq!(lines[analysis + 2], "Breach detected.");

    let remediation = lines
        .iter()
        .position(|l| *l == "### Remediation Actions:")
        .unwrap();
    assert_eq!(lines[remediation + 2], "Rotate keys.");
}

#[tokio::test]
async fn entity_listing_is_scoped_to_the_finding_account() {
    let h = happy_harness(6.0);
    h.pipeline.run(&trigger("F1")).await;

    assert_eq!(
        h.graph.entity_calls(),
        vec![("arn:graph/one".to_string(), Some("A1".to_string()))]
    );
}

// ── Severity gate ─────────────────────────────────────────────────────────

#[tokio::test]
async fn low_severity_skips_with_zero_downstream_calls() {
    let h = happy_harness(3.9);
    let result = h.pipeline.run(&trigger("F1")).await;

    assert_eq!(result.status, 200);
    assert_eq!(result.body, "Finding F1 has severity of 3.9 not processing");

    // The finding itself must be read to learn its severity...
    assert_eq!(h.findings.call_count(), 1);
    // ...but nothing else is touched.
    assert_eq!(h.graph.graph_call_count(), 0);
    assert_eq!(h.graph.entity_call_count(), 0);
    assert_eq!(h.model.call_count(), 0);
    assert_eq!(h.store.put_count(), 0);
    assert_eq!(h.bus.call_count(), 0);
    assert!(h.scheduler.created().is_empty());
}

#[tokio::test]
async fn severity_exactly_at_threshold_processes() {
    let h = happy_harness(4.0);
    let result = h.pipeline.run(&trigger("F1")).await;

    assert_eq!(result.status, 200);
    assert_eq!(result.body, ANALYSIS_TEXT);
    assert_eq!(h.model.call_count(), 1);
}

// ── Throttling and rescheduling ───────────────────────────────────────────

#[tokio::test]
async fn rate_limit_reschedules_instead_of_failing() {
    let h = build(
        FakeFindingSource::with_finding("det-1", sample_finding(6.0)),
        one_member_graph(),
        FakeAnalysisModel::rate_limited(),
        FakeObjectStore::new(),
        FakeNotificationBus::new(),
        FakeOneShotScheduler::new(),
    );
    let result = h.pipeline.run(&trigger("F1")).await;

    assert_eq!(result.status, 200);
    assert_eq!(result.body, "Event scheduled.");

    let created = h.scheduler.created();
    assert_eq!(created.len(), 1);
    assert!(created[0].name.starts_with("retry-"));
    // The replay carries everything needed to re-derive the finding, plus
    // its own cleanup marker.
    assert_eq!(created[0].replay["detail"]["id"], "F1");
    assert_eq!(created[0].replay["detail"]["service"]["detectorId"], "det-1");
    assert_eq!(created[0].replay["detail"]["retryRuleName"], created[0].name);
    assert_eq!(created[0].replay["account"], "111122223333");
    assert_eq!(created[0].replay["region"], "us-east-1");

    // No storage, no notification.
    assert_eq!(h.store.put_count(), 0);
    assert_eq!(h.bus.call_count(), 0);
}

#[tokio::test]
async fn failed_retry_registration_surfaces_the_unresolved_throttle() {
    let h = build(
        FakeFindingSource::with_finding("det-1", sample_finding(6.0)),
        one_member_graph(),
        FakeAnalysisModel::rate_limited(),
        FakeObjectStore::new(),
        FakeNotificationBus::new(),
        FakeOneShotScheduler::failing_create("rule limit reached"),
    );
    let result = h.pipeline.run(&trigger("F1")).await;

    assert_eq!(result.status, 500);
    assert!(result.body.contains("throttled"));
    assert_eq!(h.store.put_count(), 0);
    assert_eq!(h.bus.call_count(), 0);
}

// ── Retry-marker cleanup ──────────────────────────────────────────────────

#[tokio::test]
async fn successful_replay_deletes_its_own_schedule() {
    let h = happy_harness(6.0);
    let result = h
        .pipeline
        .run(&trigger_with_marker("F1", "retry-old-1"))
        .await;

    assert_eq!(result.status, 200);
    assert_eq!(h.scheduler.deleted(), vec!["retry-old-1"]);
}

#[tokio::test]
async fn cancellation_failure_does_not_demote_success() {
    let h = build(
        FakeFindingSource::with_finding("det-1", sample_finding(6.0)),
        one_member_graph(),
        FakeAnalysisModel::respond_with(ANALYSIS_TEXT),
        FakeObjectStore::new(),
        FakeNotificationBus::new(),
        FakeOneShotScheduler::failing_delete("already gone"),
    );
    let result = h
        .pipeline
        .run(&trigger_with_marker("F1", "retry-old-1"))
        .await;

    assert_eq!(result.status, 200);
    assert_eq!(result.body, ANALYSIS_TEXT);
}

#[tokio::test]
async fn skipped_run_leaves_its_retry_schedule_alone() {
    let h = happy_harness(3.9);
    h.pipeline
        .run(&trigger_with_marker("F1", "retry-old-1"))
        .await;

    // Only a run that publishes cleans up; a skip is not that run.
    assert!(h.scheduler.deleted().is_empty());
}

// ── Validation ────────────────────────────────────────────────────────────

#[tokio::test]
async fn malformed_trigger_fails_before_any_external_call() {
    let h = happy_harness(6.0);
    let mut event = trigger("F1");
    event.detail.id = String::new();

    let result = h.pipeline.run(&event).await;

    assert_eq!(result.status, 500);
    assert!(result.body.contains("invalid trigger event"));
    assert_eq!(h.findings.call_count(), 0);
    assert_eq!(h.model.call_count(), 0);
    assert!(h.scheduler.created().is_empty());
}

// ── Fatal enrichment and publish failures ─────────────────────────────────

#[tokio::test]
async fn missing_finding_fails_the_run() {
    let h = build(
        FakeFindingSource::new(),
        one_member_graph(),
        FakeAnalysisModel::respond_with(ANALYSIS_TEXT),
        FakeObjectStore::new(),
        FakeNotificationBus::new(),
        FakeOneShotScheduler::new(),
    );
    let result = h.pipeline.run(&trigger("F1")).await;

    assert_eq!(result.status, 500);
    assert!(result.body.contains("not found"));
}

#[tokio::test]
async fn absent_graph_fails_the_run() {
    let h = build(
        FakeFindingSource::with_finding("det-1", sample_finding(6.0)),
        FakeGraphSource::empty(),
        FakeAnalysisModel::respond_with(ANALYSIS_TEXT),
        FakeObjectStore::new(),
        FakeNotificationBus::new(),
        FakeOneShotScheduler::new(),
    );
    let result = h.pipeline.run(&trigger("F1")).await;

    assert_eq!(result.status, 500);
    assert!(result.body.contains("no entity graph"));
    assert_eq!(h.model.call_count(), 0);
}

#[tokio::test]
async fn analysis_invocation_failure_is_fatal() {
    let h = build(
        FakeFindingSource::with_finding("det-1", sample_finding(6.0)),
        one_member_graph(),
        FakeAnalysisModel::failing("payload too large"),
        FakeObjectStore::new(),
        FakeNotificationBus::new(),
        FakeOneShotScheduler::new(),
    );
    let result = h.pipeline.run(&trigger("F1")).await;

    assert_eq!(result.status, 500);
    assert!(result.body.contains("payload too large"));
    assert!(h.scheduler.created().is_empty());
    assert_eq!(h.store.put_count(), 0);
}

#[tokio::test]
async fn notification_failure_fails_the_run_but_keeps_the_artifact() {
    let h = build(
        FakeFindingSource::with_finding("det-1", sample_finding(6.0)),
        one_member_graph(),
        FakeAnalysisModel::respond_with(ANALYSIS_TEXT),
        FakeObjectStore::new(),
        FakeNotificationBus::failing("topic deleted"),
        FakeOneShotScheduler::new(),
    );
    let result = h.pipeline.run(&trigger("F1")).await;

    assert_eq!(result.status, 500);
    assert!(result.body.contains("topic deleted"));
    assert!(h.store.object("F1.md").is_some());
}

// ── Degraded-but-successful paths ─────────────────────────────────────────

#[tokio::test]
async fn empty_analysis_text_still_completes() {
    let h = build(
        FakeFindingSource::with_finding("det-1", sample_finding(6.0)),
        one_member_graph(),
        FakeAnalysisModel::raw_body(json!({ "content": [] })),
        FakeObjectStore::new(),
        FakeNotificationBus::new(),
        FakeOneShotScheduler::new(),
    );
    let result = h.pipeline.run(&trigger("F1")).await;

    assert_eq!(result.status, 200);
    assert_eq!(result.body, "");
    assert_eq!(h.bus.call_count(), 1);
}

#[tokio::test]
async fn truncated_entity_listing_does_not_fail_the_run() {
    let h = build(
        FakeFindingSource::with_finding("det-1", sample_finding(6.0)),
        one_member_graph().with_truncation("page-2"),
        FakeAnalysisModel::respond_with(ANALYSIS_TEXT),
        FakeObjectStore::new(),
        FakeNotificationBus::new(),
        FakeOneShotScheduler::new(),
    );
    let result = h.pipeline.run(&trigger("F1")).await;

    assert_eq!(result.status, 200);
    assert_eq!(result.body, ANALYSIS_TEXT);
}
