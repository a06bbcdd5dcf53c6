//! In-memory fakes for capability traits (testing only)
//!
//! Each fake satisfies its trait contract without external dependencies,
//! records the calls it receives, and can be scripted to fail so pipeline
//! tests can assert both the happy path and every propagation rule.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::error::{
    AnalysisError, FindingSourceError, GraphSourceError, NotificationError, SchedulerError,
    StorageError,
};
use crate::traits::*;

// ---------------------------------------------------------------------------
// FakeFindingSource
// ---------------------------------------------------------------------------

/// Finding lookup backed by a `HashMap<"{detector}/{finding}", Finding>`.
#[derive(Debug, Default)]
pub struct FakeFindingSource {
    findings: Mutex<HashMap<String, Finding>>,
    error: Option<String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeFindingSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source holding exactly one finding under the given detector.
    pub fn with_finding(detector_id: &str, finding: Finding) -> Self {
        let fake = Self::default();
        fake.findings
            .lock()
            .unwrap()
            .insert(format!("{}/{}", detector_id, finding.id), finding);
        fake
    }

    /// A source whose every lookup fails with a provider error.
    pub fn failing(reason: &str) -> Self {
        Self {
            error: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl FindingSource for FakeFindingSource {
    async fn get_finding(
        &self,
        detector_id: &str,
        finding_id: &str,
    ) -> Result<Finding, FindingSourceError> {
        self.calls
            .lock()
            .unwrap()
            .push((detector_id.to_string(), finding_id.to_string()));
        if let Some(reason) = &self.error {
            return Err(FindingSourceError::Provider(reason.clone()));
        }
        self.findings
            .lock()
            .unwrap()
            .get(&format!("{}/{}", detector_id, finding_id))
            .cloned()
            .ok_or_else(|| FindingSourceError::NotFound {
                detector_id: detector_id.to_string(),
                finding_id: finding_id.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// FakeGraphSource
// ---------------------------------------------------------------------------

/// Graph source with a fixed graph list and member set.
#[derive(Debug, Default)]
pub struct FakeGraphSource {
    graphs: Vec<String>,
    entities: Vec<EntityRecord>,
    next_token: Option<String>,
    error: Option<String>,
    graph_calls: Mutex<usize>,
    entity_calls: Mutex<Vec<(String, Option<String>)>>,
}

impl FakeGraphSource {
    pub fn new(graphs: Vec<String>, entities: Vec<EntityRecord>) -> Self {
        Self {
            graphs,
            entities,
            ..Self::default()
        }
    }

    /// A source with no graphs at all (every listing is `NoGraph` territory).
    pub fn empty() -> Self {
        Self::default()
    }

    /// A source whose every call fails with a provider error.
    pub fn failing(reason: &str) -> Self {
        Self {
            error: Some(reason.to_string()),
            ..Self::default()
        }
    }

    /// Script a continuation token on the entity listing, simulating an
    /// unexpectedly truncated result set.
    pub fn with_truncation(mut self, token: &str) -> Self {
        self.next_token = Some(token.to_string());
        self
    }

    pub fn graph_call_count(&self) -> usize {
        *self.graph_calls.lock().unwrap()
    }

    pub fn entity_call_count(&self) -> usize {
        self.entity_calls.lock().unwrap().len()
    }

    /// The `(graph_arn, account_id)` arguments of each entity listing.
    pub fn entity_calls(&self) -> Vec<(String, Option<String>)> {
        self.entity_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GraphSource for FakeGraphSource {
    async fn list_graphs(&self) -> Result<Vec<String>, GraphSourceError> {
        *self.graph_calls.lock().unwrap() += 1;
        if let Some(reason) = &self.error {
            return Err(GraphSourceError::Provider(reason.clone()));
        }
        Ok(self.graphs.clone())
    }

    async fn list_entities(
        &self,
        graph_arn: &str,
        account_id: Option<&str>,
    ) -> Result<EntityPage, GraphSourceError> {
        self.entity_calls
            .lock()
            .unwrap()
            .push((graph_arn.to_string(), account_id.map(str::to_string)));
        if let Some(reason) = &self.error {
            return Err(GraphSourceError::Provider(reason.clone()));
        }
        let entities = match account_id {
            Some(account) => self
                .entities
                .iter()
                .filter(|e| e.account_id == account)
                .cloned()
                .collect(),
            None => self.entities.clone(),
        };
        Ok(EntityPage {
            entities,
            next_token: self.next_token.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// FakeAnalysisModel
// ---------------------------------------------------------------------------

/// What the fake model should do when invoked.
#[derive(Debug, Clone)]
pub enum AnalysisScript {
    /// Answer with a provider-shaped body wrapping the given text.
    Text(String),
    /// Answer with an arbitrary raw body.
    Body(Value),
    /// Signal the provider's rate-limit condition.
    RateLimited,
    /// Fail with an invocation error.
    Fail(String),
}

/// Scripted analysis model that records every request it receives.
#[derive(Debug)]
pub struct FakeAnalysisModel {
    script: AnalysisScript,
    requests: Mutex<Vec<AnalysisRequest>>,
}

impl FakeAnalysisModel {
    pub fn respond_with(text: &str) -> Self {
        Self {
            script: AnalysisScript::Text(text.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn raw_body(body: Value) -> Self {
        Self {
            script: AnalysisScript::Body(body),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn rate_limited() -> Self {
        Self {
            script: AnalysisScript::RateLimited,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            script: AnalysisScript::Fail(reason.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The requests received so far, in order.
    pub fn requests(&self) -> Vec<AnalysisRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisModel for FakeAnalysisModel {
    async fn invoke(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, AnalysisError> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.script {
            AnalysisScript::Text(text) => Ok(AnalysisResponse {
                body: json!({ "content": [{ "type": "text", "text": text }] }),
            }),
            AnalysisScript::Body(body) => Ok(AnalysisResponse { body: body.clone() }),
            AnalysisScript::RateLimited => Err(AnalysisError::RateLimited),
            AnalysisScript::Fail(reason) => Err(AnalysisError::Invocation(reason.clone())),
        }
    }
}

// ---------------------------------------------------------------------------
// FakeObjectStore
// ---------------------------------------------------------------------------

/// One stored object.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Object store backed by a `HashMap<key, StoredObject>`.
#[derive(Debug)]
pub struct FakeObjectStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    base_url: String,
    fail_put: Option<String>,
    fail_presign: Option<String>,
    put_calls: Mutex<Vec<String>>,
    presign_calls: Mutex<Vec<(String, u64)>>,
}

impl Default for FakeObjectStore {
    fn default() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            base_url: "https://objects.test".to_string(),
            fail_put: None,
            fail_presign: None,
            put_calls: Mutex::new(Vec::new()),
            presign_calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the base URL used for presigned links (useful for testing
    /// whitespace encoding downstream).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn failing_put(reason: &str) -> Self {
        Self {
            fail_put: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub fn failing_presign(reason: &str) -> Self {
        Self {
            fail_presign: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn put_count(&self) -> usize {
        self.put_calls.lock().unwrap().len()
    }

    pub fn presign_calls(&self) -> Vec<(String, u64)> {
        self.presign_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError> {
        self.put_calls.lock().unwrap().push(key.to_string());
        if let Some(reason) = &self.fail_put {
            return Err(StorageError::Put {
                key: key.to_string(),
                reason: reason.clone(),
            });
        }
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn presign(&self, key: &str, ttl_secs: u64) -> Result<String, StorageError> {
        self.presign_calls
            .lock()
            .unwrap()
            .push((key.to_string(), ttl_secs));
        if let Some(reason) = &self.fail_presign {
            return Err(StorageError::Presign {
                key: key.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(format!("{}/{}?ttl={}", self.base_url, key, ttl_secs))
    }
}

// ---------------------------------------------------------------------------
// FakeNotificationBus
// ---------------------------------------------------------------------------

/// One captured publish call.
#[derive(Debug, Clone, PartialEq)]
pub struct SentNotification {
    pub topic: String,
    pub message: NotificationMessage,
    pub subject: String,
}

/// Notification bus that captures everything published to it.
#[derive(Debug, Default)]
pub struct FakeNotificationBus {
    sent: Mutex<Vec<SentNotification>>,
    error: Option<String>,
}

impl FakeNotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            error: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationBus for FakeNotificationBus {
    async fn publish(
        &self,
        topic: &str,
        message: &NotificationMessage,
        subject: &str,
    ) -> Result<(), NotificationError> {
        if let Some(reason) = &self.error {
            return Err(NotificationError::Publish(reason.clone()));
        }
        self.sent.lock().unwrap().push(SentNotification {
            topic: topic.to_string(),
            message: message.clone(),
            subject: subject.to_string(),
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeOneShotScheduler
// ---------------------------------------------------------------------------

/// One captured schedule registration.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedSchedule {
    pub name: String,
    pub when: DateTime<Utc>,
    pub replay: Value,
}

/// Scheduler that records registrations and deletions.
#[derive(Debug, Default)]
pub struct FakeOneShotScheduler {
    created: Mutex<Vec<CreatedSchedule>>,
    deleted: Mutex<Vec<String>>,
    fail_create: Option<String>,
    fail_delete: Option<String>,
}

impl FakeOneShotScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_create(reason: &str) -> Self {
        Self {
            fail_create: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub fn failing_delete(reason: &str) -> Self {
        Self {
            fail_delete: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub fn created(&self) -> Vec<CreatedSchedule> {
        self.created.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl OneShotScheduler for FakeOneShotScheduler {
    async fn create_one_shot(
        &self,
        name: &str,
        when: DateTime<Utc>,
        replay: &Value,
    ) -> Result<(), SchedulerError> {
        if let Some(reason) = &self.fail_create {
            return Err(SchedulerError::Create {
                name: name.to_string(),
                reason: reason.clone(),
            });
        }
        self.created.lock().unwrap().push(CreatedSchedule {
            name: name.to_string(),
            when,
            replay: replay.clone(),
        });
        Ok(())
    }

    async fn delete_one_shot(&self, name: &str) -> Result<(), SchedulerError> {
        if let Some(reason) = &self.fail_delete {
            return Err(SchedulerError::Delete {
                name: name.to_string(),
                reason: reason.clone(),
            });
        }
        self.deleted.lock().unwrap().push(name.to_string());
        Ok(())
    }
}
