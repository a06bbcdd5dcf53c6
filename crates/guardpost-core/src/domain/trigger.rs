//! The provider event that triggers one pipeline run.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::ValidationError;

/// One incoming trigger event.
///
/// Envelope fields are carried verbatim so that a rescheduled replay is a
/// full copy of the original trigger: the retried run must be able to
/// re-derive the finding (account, region, schema version, partition,
/// detector id, finding id) from the replay alone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriggerEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(
        rename = "detail-type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub detail_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Account the event was raised in.
    pub account: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    /// Region the event was raised in.
    pub region: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Value>,

    pub detail: TriggerDetail,
}

/// The finding-bearing detail section of a trigger event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TriggerDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,

    /// Finding identifier. Required; an empty value fails validation.
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub service: TriggerService,

    /// Name of the one-shot schedule that replayed this event, if this run
    /// is a retry. A run that completes successfully deletes the named
    /// schedule on its way out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_rule_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TriggerService {
    /// Detector identifier. Required; an empty value fails validation.
    #[serde(default)]
    pub detector_id: String,
}

impl TriggerEvent {
    /// Check the required fields. Runs before any external call.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.detail.id.trim().is_empty() {
            return Err(ValidationError::MissingFindingId);
        }
        if self.detail.service.detector_id.trim().is_empty() {
            return Err(ValidationError::MissingDetectorId);
        }
        Ok(())
    }

    pub fn finding_id(&self) -> &str {
        &self.detail.id
    }

    pub fn detector_id(&self) -> &str {
        &self.detail.service.detector_id
    }

    pub fn retry_rule_name(&self) -> Option<&str> {
        self.detail.retry_rule_name.as_deref()
    }

    /// Full copy of this event annotated with the schedule that will replay
    /// it. The detail re-asserts account and region from the envelope so the
    /// retried run can re-derive the finding even if the host strips the
    /// envelope on redelivery.
    pub fn replay_with_marker(&self, rule_name: &str) -> TriggerEvent {
        let mut replay = self.clone();
        replay.detail.account_id = Some(self.account.clone());
        replay.detail.region = Some(self.region.clone());
        replay.detail.retry_rule_name = Some(rule_name.to_string());
        replay
    }
}
