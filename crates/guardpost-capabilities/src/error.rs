//! Error types for the capability layer.
//!
//! Each capability gets its own enum so callers can match on the conditions
//! that matter to control flow (a missing finding, an absent graph, a
//! throttled model) without string inspection. Everything else is carried as
//! the provider's own description.

use thiserror::Error;

/// Errors from the finding source capability.
#[derive(Debug, Error)]
pub enum FindingSourceError {
    /// The provider reported zero results for the requested finding.
    #[error("finding {finding_id} not found for detector {detector_id}")]
    NotFound {
        detector_id: String,
        finding_id: String,
    },

    /// Any other provider-side failure, propagated unmodified.
    #[error("finding source error: {0}")]
    Provider(String),
}

/// Errors from the entity-graph source capability.
#[derive(Debug, Error)]
pub enum GraphSourceError {
    /// No entity graph exists for this account.
    #[error("no entity graph available")]
    NoGraph,

    #[error("graph source error: {0}")]
    Provider(String),
}

/// Errors from the generative-analysis capability.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The provider throttled the request. Not a failure: the pipeline
    /// reschedules the run instead of aborting.
    #[error("analysis capability throttled the request")]
    RateLimited,

    /// Any other invocation failure, including oversized request payloads
    /// rejected by the provider's own size ceilings. Fatal.
    #[error("analysis invocation failed: {0}")]
    Invocation(String),
}

/// Errors from the object store capability.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object put failed for key {key}: {reason}")]
    Put { key: String, reason: String },

    #[error("presign failed for key {key}: {reason}")]
    Presign { key: String, reason: String },
}

/// Errors from the notification bus capability.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification publish failed: {0}")]
    Publish(String),
}

/// Errors from the one-shot scheduler capability.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("failed to register one-shot schedule {name}: {reason}")]
    Create { name: String, reason: String },

    #[error("failed to delete one-shot schedule {name}: {reason}")]
    Delete { name: String, reason: String },
}
