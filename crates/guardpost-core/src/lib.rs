//! Guardpost Core Library
//!
//! The finding enrichment pipeline: severity gating, entity-graph
//! enrichment, generative analysis with throttle-driven rescheduling,
//! deterministic report rendering, and publishing.

pub mod analysis;
pub mod config;
pub mod domain;
pub mod enrichment;
pub mod gate;
pub mod metrics;
pub mod obs;
pub mod pipeline;
pub mod publish;
pub mod report;
pub mod retry;
pub mod telemetry;

pub use analysis::{AnalysisInvoker, AnalysisOutcome};
pub use config::{parse_body_arg, ConfigError, GenerationParams, PipelineConfig, DEFAULT_MODEL_ID};
pub use domain::{
    normalize_value, PipelineError, Result, RunOutcome, RunResult, RunState, TriggerDetail,
    TriggerEvent, TriggerService, ValidationError,
};
pub use enrichment::EnrichmentReader;
pub use gate::{evaluate_gate, GateDecision, SEVERITY_THRESHOLD};
pub use metrics::METRICS;
pub use obs::RunSpan;
pub use pipeline::{Collaborators, Pipeline};
pub use publish::{PublishedArtifact, Publisher, LINK_TTL_SECS};
pub use report::{
    detective_console_url, guardduty_console_url, Block, HeadingWeight, Page, Report,
    PRIMARY_HEADINGS, REPORT_CONTENT_TYPE, REPORT_EXTENSION, SECONDARY_HEADINGS,
};
pub use retry::{RetryScheduler, ScheduledRetry, MAX_DELAY_SECS, MIN_DELAY_SECS};
pub use telemetry::init_tracing;

/// Guardpost version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
