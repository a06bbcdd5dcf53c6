//! Domain-level error taxonomy for the enrichment pipeline.

use guardpost_capabilities::{
    AnalysisError, FindingSourceError, GraphSourceError, NotificationError, SchedulerError,
    StorageError,
};

/// Errors produced by trigger-event validation.
///
/// Validation runs before any external call; a malformed trigger fails the
/// run immediately and never creates a retry schedule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("trigger event missing finding identifier (detail.id)")]
    MissingFindingId,

    #[error("trigger event missing detector identifier (detail.service.detectorId)")]
    MissingDetectorId,
}

/// Fatal pipeline errors.
///
/// Everything here aborts the run and surfaces as a 500 result. The one
/// provider condition that is *not* fatal — an analysis rate limit — is
/// intercepted by the invoker before it can reach this type; if the
/// replacement schedule cannot be registered either, the run fails as
/// `RetryNotScheduled`.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid trigger event: {0}")]
    Validation(#[from] ValidationError),

    #[error("finding lookup failed: {0}")]
    FindingSource(#[from] FindingSourceError),

    #[error("graph enrichment failed: {0}")]
    GraphSource(#[from] GraphSourceError),

    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("report storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("notification failed: {0}")]
    Notification(#[from] NotificationError),

    #[error("throttled, and retry registration failed: {0}")]
    RetryNotScheduled(SchedulerError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
