//! Report publishing: durable storage, pre-signed link, notification.

use std::sync::Arc;

use guardpost_capabilities::{NotificationBus, NotificationMessage, ObjectStore};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::domain::Result;
use crate::report::{REPORT_CONTENT_TYPE, REPORT_EXTENSION};

/// Pre-signed link lifetime, in seconds.
pub const LINK_TTL_SECS: u64 = 3600;

const NOTIFICATION_SUBJECT: &str = "GuardDuty Finding Enrichment Report";

/// What a successful publish left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedArtifact {
    /// Object key, deterministic per finding: `<findingId>.md`. A second
    /// concurrent run for the same finding overwrites the first artifact.
    pub key: String,
    /// SHA-256 hex digest of the stored bytes.
    pub digest: String,
    /// Pre-signed access URL, whitespace-encoded.
    pub url: String,
}

pub struct Publisher {
    store: Arc<dyn ObjectStore>,
    bus: Arc<dyn NotificationBus>,
    topic: String,
}

impl Publisher {
    pub fn new(store: Arc<dyn ObjectStore>, bus: Arc<dyn NotificationBus>, topic: &str) -> Self {
        Self {
            store,
            bus,
            topic: topic.to_string(),
        }
    }

    /// Store the rendered report and broadcast the notification.
    ///
    /// No partial-success semantics: a notification failure after a
    /// successful upload still fails the run; the artifact remains in
    /// storage.
    pub async fn publish(&self, report_bytes: &[u8], finding_id: &str) -> Result<PublishedArtifact> {
        let key = format!("{}.{}", finding_id, REPORT_EXTENSION);
        let digest = hex::encode(Sha256::digest(report_bytes));

        self.store
            .put(&key, report_bytes, REPORT_CONTENT_TYPE)
            .await?;
        info!(
            key = %key,
            digest = %digest,
            bytes = report_bytes.len(),
            "report stored"
        );

        let raw_url = self.store.presign(&key, LINK_TTL_SECS).await?;
        let url = encode_whitespace(&raw_url);

        let message = NotificationMessage {
            default: "New GuardDuty finding with enriched report. Click the link to download."
                .to_string(),
            email: format!(
                "New GuardDuty finding. Enriched report with AI remediations can be \
                 downloaded here: {url}"
            ),
        };
        self.bus
            .publish(&self.topic, &message, NOTIFICATION_SUBJECT)
            .await?;
        info!(topic = %self.topic, "notification sent");

        Ok(PublishedArtifact { key, digest, url })
    }
}

/// Percent-encode whitespace embedded in a pre-signed URL.
fn encode_whitespace(url: &str) -> String {
    url.trim().replace(' ', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;
    use guardpost_capabilities::fakes::{FakeNotificationBus, FakeObjectStore};
    use crate::domain::PipelineError;

    fn publisher(store: Arc<FakeObjectStore>, bus: Arc<FakeNotificationBus>) -> Publisher {
        Publisher::new(store, bus, "arn:topic:reports")
    }

    #[test]
    fn whitespace_is_percent_encoded() {
        assert_eq!(
            encode_whitespace("  https://h/a key?x=1  "),
            "https://h/a%20key?x=1"
        );
    }

    #[tokio::test]
    async fn publish_stores_then_notifies_with_the_link() {
        let store = Arc::new(FakeObjectStore::new());
        let bus = Arc::new(FakeNotificationBus::new());
        let publisher = publisher(store.clone(), bus.clone());

        let artifact = publisher.publish(b"report body", "F1").await.unwrap();
        assert_eq!(artifact.key, "F1.md");

        let stored = store.object("F1.md").unwrap();
        assert_eq!(stored.bytes, b"report body");
        assert_eq!(stored.content_type, REPORT_CONTENT_TYPE);
        assert_eq!(store.presign_calls(), vec![("F1.md".to_string(), 3600)]);

        let sent = bus.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].topic, "arn:topic:reports");
        assert_eq!(sent[0].subject, NOTIFICATION_SUBJECT);
        assert!(sent[0].message.email.contains(&artifact.url));
    }

    #[tokio::test]
    async fn presigned_url_whitespace_is_encoded_before_notification() {
        let store = Arc::new(FakeObjectStore::new().with_base_url("https://objects.test/my reports"));
        let bus = Arc::new(FakeNotificationBus::new());
        let publisher = publisher(store, bus.clone());

        let artifact = publisher.publish(b"bytes", "F1").await.unwrap();
        assert_eq!(artifact.url, "https://objects.test/my%20reports/F1.md?ttl=3600");
        assert!(bus.sent()[0].message.email.contains("my%20reports"));
    }

    #[tokio::test]
    async fn storage_failure_is_fatal_and_skips_notification() {
        let bus = Arc::new(FakeNotificationBus::new());
        let publisher = publisher(Arc::new(FakeObjectStore::failing_put("bucket gone")), bus.clone());

        let err = publisher.publish(b"bytes", "F1").await.unwrap_err();
        assert!(matches!(err, PipelineError::Storage(_)));
        assert_eq!(bus.call_count(), 0);
    }

    #[tokio::test]
    async fn notification_failure_after_upload_is_still_fatal() {
        let store = Arc::new(FakeObjectStore::new());
        let publisher = publisher(store.clone(), Arc::new(FakeNotificationBus::failing("down")));

        let err = publisher.publish(b"bytes", "F1").await.unwrap_err();
        assert!(matches!(err, PipelineError::Notification(_)));
        // The artifact remains even though the run failed.
        assert!(store.object("F1.md").is_some());
    }
}
