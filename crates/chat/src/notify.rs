use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
#[error("message delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Outbound transport seam. Implementations deliver a text message to a
/// chat recipient (customer or operator).
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, recipient: &str, text: &str) -> Result<(), NotifyError>;
}

/// Best-effort wrapper around a sink. Delivery failures are logged and
/// swallowed: a dropped reply must never fail the turn or roll back an
/// already-committed order.
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    pub async fn send(&self, recipient: &str, text: &str) {
        if let Err(err) = self.sink.deliver(recipient, text).await {
            tracing::warn!(
                event_name = "notification_delivery_failed",
                recipient = %recipient,
                error = %err,
                "failed to deliver outbound message",
            );
        }
    }
}

/// Sink that drops everything. Useful when no transport is wired up.
pub struct NoopSink;

#[async_trait]
impl NotificationSink for NoopSink {
    async fn deliver(&self, _recipient: &str, _text: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Sink that records deliveries for assertions.
#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<(String, String)> {
        self.messages.lock().await.clone()
    }

    pub async fn sent_to(&self, recipient: &str) -> Vec<String> {
        self.messages
            .lock()
            .await
            .iter()
            .filter(|(to, _)| to == recipient)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub async fn clear(&self) {
        self.messages.lock().await.clear();
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, recipient: &str, text: &str) -> Result<(), NotifyError> {
        self.messages.lock().await.push((recipient.to_string(), text.to_string()));
        Ok(())
    }
}
