//! Terminal run notifications.
//!
//! A run sends at most one [`NotificationEvent`]. Delivery is best-effort:
//! failures are logged by the orchestrator and never change the outcome.

use crate::context::DeploymentRequest;
use crate::errors::{DeployResult, DeployflowError};
use crate::http::{is_success_status, HttpTransport};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Outcome carried by a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    /// The run completed.
    Success,
    /// A fatal step failed.
    Error,
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A terminal status message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Success or error.
    pub status: NotificationStatus,
    /// Human readable text.
    pub message: String,
}

impl NotificationEvent {
    /// Success message for a completed run.
    #[must_use]
    pub fn success(app: &str, request: &DeploymentRequest) -> Self {
        Self {
            status: NotificationStatus::Success,
            message: format!(
                "✅ Deployment of {app} {} to {} succeeded",
                request.version(),
                request.environment()
            ),
        }
    }

    /// Error message naming the failing step.
    #[must_use]
    pub fn error(app: &str, request: &DeploymentRequest, step: &str) -> Self {
        Self {
            status: NotificationStatus::Error,
            message: format!(
                "❌ Deployment of {app} {} to {} failed at step '{step}'",
                request.version(),
                request.environment()
            ),
        }
    }

    /// Webhook payload, `{"text": message}`.
    #[must_use]
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({ "text": self.message })
    }
}

/// Delivers notification events.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends the event.
    async fn notify(&self, event: &NotificationEvent) -> DeployResult<()>;
}

/// Discards all events. Used when no webhook is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpNotifier;

#[async_trait]
impl Notifier for NoOpNotifier {
    async fn notify(&self, _event: &NotificationEvent) -> DeployResult<()> {
        Ok(())
    }
}

/// Posts events to a chat webhook.
#[derive(Clone)]
pub struct WebhookNotifier {
    url: String,
    transport: Arc<dyn HttpTransport>,
}

impl WebhookNotifier {
    /// Creates a webhook notifier.
    #[must_use]
    pub fn new(url: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            url: url.into(),
            transport,
        }
    }
}

impl fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The URL embeds a secret token.
        f.debug_struct("WebhookNotifier").finish_non_exhaustive()
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, event: &NotificationEvent) -> DeployResult<()> {
        let status = self
            .transport
            .post_json(&self.url, &event.to_payload())
            .await
            .map_err(|e| DeployflowError::Notification(e.to_string()))?;
        if is_success_status(status) {
            Ok(())
        } else {
            Err(DeployflowError::Notification(format!(
                "webhook answered with status {status}"
            )))
        }
    }
}

/// Picks the notifier for an optional webhook URL.
#[must_use]
pub fn notifier_for(webhook: Option<&str>, transport: Arc<dyn HttpTransport>) -> Arc<dyn Notifier> {
    match webhook {
        Some(url) => Arc::new(WebhookNotifier::new(url, transport)),
        None => Arc::new(NoOpNotifier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeployConfig;
    use crate::testing::RecordingTransport;

    fn request() -> DeploymentRequest {
        DeploymentRequest::new(Some("production"), Some("v2.3.1"), &DeployConfig::default())
    }

    #[test]
    fn test_messages_mention_version_and_environment() {
        let ok = NotificationEvent::success("test-automation", &request());
        assert!(ok.message.contains("v2.3.1"));
        assert!(ok.message.contains("production"));

        let err = NotificationEvent::error("test-automation", &request(), "push");
        assert_eq!(err.status, NotificationStatus::Error);
        assert!(err.message.contains("v2.3.1"));
        assert!(err.message.contains("production"));
        assert!(err.message.contains("push"));
    }

    #[test]
    fn test_payload_shape() {
        let event = NotificationEvent::success("app", &request());
        let payload = event.to_payload();
        assert_eq!(payload, serde_json::json!({ "text": event.message }));
    }

    #[tokio::test]
    async fn test_webhook_posts_payload() {
        let transport = Arc::new(RecordingTransport::new());
        let notifier = WebhookNotifier::new("https://hooks.example.com/x", transport.clone());
        let event = NotificationEvent::success("app", &request());

        notifier.notify(&event).await.unwrap();

        let posts = transport.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, "https://hooks.example.com/x");
        assert_eq!(posts[0].1["text"], serde_json::json!(event.message));
    }

    #[tokio::test]
    async fn test_webhook_non_2xx_is_error() {
        let transport = Arc::new(RecordingTransport::new().with_post_status(500));
        let notifier = WebhookNotifier::new("https://hooks.example.com/x", transport);
        let event = NotificationEvent::success("app", &request());

        let err = notifier.notify(&event).await.unwrap_err();
        assert!(matches!(err, DeployflowError::Notification(_)));
    }

    #[tokio::test]
    async fn test_no_webhook_makes_no_calls() {
        let transport = Arc::new(RecordingTransport::new());
        let notifier = notifier_for(None, transport.clone());

        notifier
            .notify(&NotificationEvent::success("app", &request()))
            .await
            .unwrap();
        assert!(transport.posts().is_empty());
    }
}
