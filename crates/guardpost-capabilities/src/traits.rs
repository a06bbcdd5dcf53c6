//! Capability trait definitions for Guardpost.
//!
//! These traits define the pipeline's view of the outside world:
//! - `FindingSource`: security-finding lookup (e.g. Amazon GuardDuty)
//! - `GraphSource`: entity-graph enrichment (e.g. Amazon Detective)
//! - `AnalysisModel`: generative analysis (e.g. Bedrock-hosted models)
//! - `ObjectStore`: report persistence + pre-signed links (e.g. S3)
//! - `NotificationBus`: broadcast notifications (e.g. SNS)
//! - `OneShotScheduler`: single-fire replay timers (e.g. EventBridge)
//!
//! All traits are async and backend-agnostic. The record types that cross
//! these boundaries live here too, so implementations and the core pipeline
//! share one vocabulary. In-memory fakes are provided for testing via the
//! `fakes` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{
    AnalysisError, FindingSourceError, GraphSourceError, NotificationError, SchedulerError,
    StorageError,
};

// ---------------------------------------------------------------------------
// FindingSource — security-finding lookup
// ---------------------------------------------------------------------------

/// A single detected security condition with a severity score.
///
/// Field names follow the provider wire shape (`Id`, `Severity`, ...). The
/// provider attaches an arbitrary nested detail payload; it is preserved
/// verbatim in `detail` and canonicalized by the enrichment reader before
/// serialization downstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Finding {
    /// Provider-assigned finding identifier.
    pub id: String,

    /// Numeric severity on the provider's 0.0–10.0 scale.
    pub severity: f64,

    /// Category/type label, e.g. `UnauthorizedAccess:EC2/SSHBruteForce`.
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub finding_type: Option<String>,

    /// Account that owns the finding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,

    /// Region the finding was raised in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Remaining provider-specific detail, arbitrarily nested.
    #[serde(flatten)]
    pub detail: Value,
}

/// Security-finding lookup.
///
/// Guarantees:
/// - `get_finding` returns exactly one finding or `NotFound`.
/// - Other provider failures surface as `Provider` with the original
///   description, unmodified.
#[async_trait]
pub trait FindingSource: Send + Sync {
    /// Fetch one finding by detector id + finding id.
    async fn get_finding(
        &self,
        detector_id: &str,
        finding_id: &str,
    ) -> Result<Finding, FindingSourceError>;
}

// ---------------------------------------------------------------------------
// GraphSource — entity-graph enrichment
// ---------------------------------------------------------------------------

/// A member record surfaced by the entity graph for one account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct EntityRecord {
    /// Account/member identifier.
    pub account_id: String,

    /// Descriptive attributes attached by the graph source.
    #[serde(flatten)]
    pub attributes: Value,
}

/// One page of entity records.
///
/// The source is not expected to paginate this listing; a populated
/// `next_token` is the truncation signal the reader must log rather than
/// silently drop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityPage {
    pub entities: Vec<EntityRecord>,
    pub next_token: Option<String>,
}

/// Entity-graph enrichment source.
#[async_trait]
pub trait GraphSource: Send + Sync {
    /// List the graph identifiers visible to this account. The first entry
    /// is the active graph; an empty list is `NoGraph`.
    async fn list_graphs(&self) -> Result<Vec<String>, GraphSourceError>;

    /// List member records for a graph, optionally filtered to one account,
    /// in a single unpaginated call.
    async fn list_entities(
        &self,
        graph_arn: &str,
        account_id: Option<&str>,
    ) -> Result<EntityPage, GraphSourceError>;
}

// ---------------------------------------------------------------------------
// AnalysisModel — generative analysis
// ---------------------------------------------------------------------------

/// A fully-built model invocation request.
///
/// `body` carries the provider-specific request document (messages,
/// generation parameters, free-form extras). The invoker does not chunk;
/// requests over the provider's size ceilings fail as `Invocation`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisRequest {
    pub model_id: String,
    pub body: Value,
}

/// The provider's response document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResponse {
    pub body: Value,
}

/// Generative-analysis capability.
///
/// `RateLimited` is a control-flow signal, not a failure: the pipeline
/// reacts by scheduling a one-shot replay of the triggering event.
#[async_trait]
pub trait AnalysisModel: Send + Sync {
    async fn invoke(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, AnalysisError>;
}

// ---------------------------------------------------------------------------
// ObjectStore — report persistence
// ---------------------------------------------------------------------------

/// Durable object storage with pre-signed read access.
///
/// Keys are deterministic per finding; concurrent writers for the same key
/// are last-writer-wins by design.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write an object. Overwrites any existing object under `key`.
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError>;

    /// Mint a time-bounded read URL for an object.
    async fn presign(&self, key: &str, ttl_secs: u64) -> Result<String, StorageError>;
}

// ---------------------------------------------------------------------------
// NotificationBus — broadcast notifications
// ---------------------------------------------------------------------------

/// Two renderings of one notification: a generic default and a richer
/// rendering for the email channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationMessage {
    pub default: String,
    pub email: String,
}

/// Broadcast notification publishing.
#[async_trait]
pub trait NotificationBus: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        message: &NotificationMessage,
        subject: &str,
    ) -> Result<(), NotificationError>;
}

// ---------------------------------------------------------------------------
// OneShotScheduler — single-fire replay timers
// ---------------------------------------------------------------------------

/// One-shot future invocation registry.
///
/// Guarantees:
/// - `create_one_shot` registers a timer that fires exactly once at `when`
///   and delivers `replay` verbatim to the pipeline's trigger input.
/// - `delete_one_shot` removes a named timer; deleting an unknown name is
///   an error the caller may choose to swallow.
#[async_trait]
pub trait OneShotScheduler: Send + Sync {
    async fn create_one_shot(
        &self,
        name: &str,
        when: DateTime<Utc>,
        replay: &Value,
    ) -> Result<(), SchedulerError>;

    async fn delete_one_shot(&self, name: &str) -> Result<(), SchedulerError>;
}
