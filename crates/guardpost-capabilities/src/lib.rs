//! Guardpost capability layer.
//!
//! Every external collaborator the enrichment pipeline talks to is reached
//! through one of the traits in this crate. The pipeline itself never holds
//! provider SDK types; a deployment wires in concrete implementations, and
//! tests wire in the in-memory fakes.
//!
//! ## Capabilities
//!
//! - `FindingSource`: fetch one security finding by detector + finding id
//! - `GraphSource`: locate the entity graph and list its member records
//! - `AnalysisModel`: generative analysis of a finding in context
//! - `ObjectStore`: durable report storage + pre-signed access links
//! - `NotificationBus`: fan-out notification publishing
//! - `OneShotScheduler`: single-fire future replays for throttled runs

mod error;
pub mod fakes;
pub mod traits;

pub use error::{
    AnalysisError, FindingSourceError, GraphSourceError, NotificationError, SchedulerError,
    StorageError,
};
pub use traits::{
    AnalysisModel, AnalysisRequest, AnalysisResponse, EntityPage, EntityRecord, Finding,
    FindingSource, GraphSource, NotificationBus, NotificationMessage, ObjectStore,
    OneShotScheduler,
};
