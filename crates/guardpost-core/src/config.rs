//! Pipeline configuration.
//!
//! Every setting arrives through one explicit, validated struct; the
//! pipeline reads nothing from ambient process state. The recognized keys
//! are enumerated here — bucket, topic, model id, generation parameters —
//! rather than discovered by prefix-scanning an environment.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Model used when none is configured.
pub const DEFAULT_MODEL_ID: &str = "anthropic.claude-3-5-sonnet-20240620-v1:0";

const DEFAULT_MAX_TOKENS: u32 = 5000;
const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Errors produced by configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("report bucket name must not be empty")]
    EmptyBucket,

    #[error("notification topic must not be empty")]
    EmptyTopic,

    #[error("analysis model id must not be empty")]
    EmptyModelId,
}

/// Generation parameters for the analysis capability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationParams {
    /// Provider model identifier.
    pub model_id: String,

    pub max_tokens: u32,

    pub temperature: f64,

    /// Free-form provider-specific request-body arguments, merged into the
    /// request after the standard fields (extras win on key collision).
    pub body_args: BTreeMap<String, Value>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            body_args: BTreeMap::new(),
        }
    }
}

impl GenerationParams {
    /// Override the model identifier.
    pub fn with_model_id(mut self, model_id: &str) -> Self {
        self.model_id = model_id.to_string();
        self
    }

    /// Add a provider-specific body argument from its raw textual form.
    /// The value is parsed as structured JSON when possible and kept as a
    /// literal string otherwise.
    pub fn with_body_arg(mut self, name: &str, raw: &str) -> Self {
        self.body_args.insert(name.to_string(), parse_body_arg(raw));
        self
    }
}

/// Parse one raw body-argument value: structured JSON when it parses, a
/// literal string otherwise.
pub fn parse_body_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Validated pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Object-storage bucket reports are written to. Consumed by the
    /// deployment when constructing the object-store capability.
    pub bucket: String,

    /// Notification topic the report link is broadcast on.
    pub topic: String,

    pub generation: GenerationParams,
}

impl PipelineConfig {
    pub fn new(bucket: &str, topic: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            topic: topic.to_string(),
            generation: GenerationParams::default(),
        }
    }

    pub fn with_generation(mut self, generation: GenerationParams) -> Self {
        self.generation = generation;
        self
    }

    /// Reject configurations that cannot possibly publish a report.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::EmptyBucket);
        }
        if self.topic.trim().is_empty() {
            return Err(ConfigError::EmptyTopic);
        }
        if self.generation.model_id.trim().is_empty() {
            return Err(ConfigError::EmptyModelId);
        }
        Ok(())
    }
}
