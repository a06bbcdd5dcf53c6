//! Enrichment reader: finding lookup plus entity-graph context.
//!
//! Owns all reads from the finding source and the graph source for the
//! duration of one run, and canonicalizes everything before it is handed
//! downstream.

use std::sync::Arc;

use guardpost_capabilities::{
    EntityRecord, Finding, FindingSource, GraphSource, GraphSourceError,
};
use tracing::{info, warn};

use crate::domain::normalize::{normalize_entity, normalize_finding};
use crate::domain::Result;

pub struct EnrichmentReader {
    findings: Arc<dyn FindingSource>,
    graph: Arc<dyn GraphSource>,
}

impl EnrichmentReader {
    pub fn new(findings: Arc<dyn FindingSource>, graph: Arc<dyn GraphSource>) -> Self {
        Self { findings, graph }
    }

    /// Fetch exactly one finding, normalized for downstream serialization.
    ///
    /// Zero results surface as `NotFound`; any other provider error
    /// propagates unmodified.
    pub async fn fetch_finding(&self, detector_id: &str, finding_id: &str) -> Result<Finding> {
        let finding = self.findings.get_finding(detector_id, finding_id).await?;
        info!(
            finding_id = %finding.id,
            severity = finding.severity,
            "retrieved finding"
        );
        Ok(normalize_finding(finding))
    }

    /// Locate the single active entity graph and fetch all member records
    /// for `account_id` in one unpaginated call.
    ///
    /// The source is not expected to paginate this listing. If it returns a
    /// continuation token anyway, only the first page is honored and the
    /// truncation is logged.
    pub async fn fetch_entities(&self, account_id: &str) -> Result<Vec<EntityRecord>> {
        let graphs = self.graph.list_graphs().await?;
        let graph_arn = graphs.first().cloned().ok_or(GraphSourceError::NoGraph)?;
        info!(graph = %graph_arn, "resolved entity graph");

        let page = self
            .graph
            .list_entities(&graph_arn, Some(account_id))
            .await?;
        if let Some(token) = &page.next_token {
            warn!(
                graph = %graph_arn,
                token = %token,
                returned = page.entities.len(),
                "entity listing unexpectedly truncated, honoring first page only"
            );
        }
        info!(count = page.entities.len(), "retrieved entity records");
        Ok(page.entities.into_iter().map(normalize_entity).collect())
    }
}
