//! Severity gate.
//!
//! Decides whether a finding warrants enrichment and analysis before any
//! model invocation is spent on it. Low-severity findings short-circuit
//! the run with a success status and no side effects.

use guardpost_capabilities::Finding;
use serde::{Deserialize, Serialize};

/// Minimum severity (inclusive) that proceeds through the pipeline.
pub const SEVERITY_THRESHOLD: f64 = 4.0;

/// Decision produced by the severity gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    /// The finding proceeds to enrichment.
    Continue,
    /// The run short-circuits; `reason` goes back to the caller verbatim.
    Skip { reason: String },
}

impl GateDecision {
    pub fn is_continue(&self) -> bool {
        matches!(self, GateDecision::Continue)
    }
}

/// Evaluate a finding against the severity threshold.
///
/// Severity exactly at the threshold continues (inclusive lower bound).
pub fn evaluate_gate(finding: &Finding) -> GateDecision {
    if finding.severity >= SEVERITY_THRESHOLD {
        GateDecision::Continue
    } else {
        GateDecision::Skip {
            reason: format!(
                "Finding {} has severity of {} not processing",
                finding.id, finding.severity
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn finding_with_severity(severity: f64) -> Finding {
        Finding {
            id: "f-1".to_string(),
            severity,
            finding_type: None,
            account_id: None,
            region: None,
            detail: json!({}),
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        assert!(evaluate_gate(&finding_with_severity(4.0)).is_continue());
    }

    #[test]
    fn high_severity_continues() {
        assert!(evaluate_gate(&finding_with_severity(8.9)).is_continue());
    }

    #[test]
    fn below_threshold_skips_with_reason() {
        match evaluate_gate(&finding_with_severity(3.9)) {
            GateDecision::Skip { reason } => {
                assert!(reason.contains("f-1"));
                assert!(reason.contains("3.9"));
            }
            GateDecision::Continue => panic!("severity 3.9 must not continue"),
        }
    }
}
