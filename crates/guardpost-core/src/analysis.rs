//! Analysis invoker: instruction construction and model invocation.
//!
//! Builds the fixed natural-language instruction embedding the serialized
//! finding and entity context, merges the configured generation parameters
//! into the request body, and interprets the provider's response. A
//! rate-limit signal from the provider is control flow, not failure.

use std::sync::Arc;

use guardpost_capabilities::{
    AnalysisError, AnalysisModel, AnalysisRequest, EntityRecord, Finding,
};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::config::GenerationParams;
use crate::domain::{PipelineError, Result};

/// What came back from the analysis capability, from the pipeline's point
/// of view.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// Free-form analysis text. Empty when the provider answered without a
    /// text field, which is degraded but not fatal.
    Text(String),
    /// The provider throttled the request; the run must be rescheduled.
    Throttled,
}

pub struct AnalysisInvoker {
    model: Arc<dyn AnalysisModel>,
    params: GenerationParams,
}

impl AnalysisInvoker {
    pub fn new(model: Arc<dyn AnalysisModel>, params: GenerationParams) -> Self {
        Self { model, params }
    }

    /// Invoke the analysis capability once for this finding.
    ///
    /// The invoker never chunks: a payload over the provider's size ceilings
    /// comes back as a fatal invocation error. Only the provider's
    /// rate-limit condition is intercepted, as `Throttled`.
    pub async fn analyze(
        &self,
        finding: &Finding,
        entities: &[EntityRecord],
    ) -> Result<AnalysisOutcome> {
        let request = self.build_request(finding, entities)?;
        debug!(model_id = %request.model_id, "invoking analysis model");

        match self.model.invoke(&request).await {
            Ok(response) => {
                let text = extract_text(&response.body);
                info!(chars = text.len(), "analysis returned");
                Ok(AnalysisOutcome::Text(text))
            }
            Err(AnalysisError::RateLimited) => {
                info!("analysis capability throttled the request");
                Ok(AnalysisOutcome::Throttled)
            }
            Err(err) => Err(PipelineError::from(err)),
        }
    }

    fn build_request(
        &self,
        finding: &Finding,
        entities: &[EntityRecord],
    ) -> Result<AnalysisRequest> {
        let prompt = build_instruction(finding, entities)?;
        let mut body = Map::new();
        body.insert(
            "messages".to_string(),
            json!([{ "role": "user", "content": prompt }]),
        );
        body.insert("max_tokens".to_string(), json!(self.params.max_tokens));
        body.insert("temperature".to_string(), json!(self.params.temperature));
        // Configured extras land last so they can override the defaults.
        for (name, value) in &self.params.body_args {
            body.insert(name.clone(), value.clone());
        }
        Ok(AnalysisRequest {
            model_id: self.params.model_id.clone(),
            body: Value::Object(body),
        })
    }
}

/// The fixed instruction the model receives, with the serialized finding
/// and entity context embedded.
fn build_instruction(finding: &Finding, entities: &[EntityRecord]) -> Result<String> {
    let finding_json = serde_json::to_string_pretty(finding)?;
    let entities_json = serde_json::to_string_pretty(entities)?;
    Ok(format!(
        "You are a cybersecurity assistant that specializes in providing actionable \
         solutions for security threats detected by AWS services. Here is the \
         GuardDuty finding and relevant enrichment data from Amazon Detective: \
         {finding_json}. Detective entities involved: {entities_json}. \
         Based on this information, determine if this was a successful breach or a \
         blocked attempt. Also, provide information on the entities involved and if \
         a security group is impacted and needs intervention. Also, provide specific \
         actions I should take to remediate this issue and prevent future \
         occurrences. The actions should come with a section header containing \
         \"Remediation Actions:\""
    ))
}

/// Pull the analysis text out of a provider response body. A missing field
/// is an empty analysis, not an error.
fn extract_text(body: &Value) -> String {
    body.get("content")
        .and_then(|content| content.get(0))
        .and_then(|first| first.get("text"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
