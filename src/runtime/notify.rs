use std::sync::Arc;
use async_trait::async_trait;
use anyhow::Result;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()>;
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl NotificationSender for TracingNotifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        info!(recipient = %recipient, subject = %subject, "[MAIL] {}", body);
        Ok(())
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSender for RecordingNotifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        self.sent.lock().await.push(Notification {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// Handler behind the default send-task binding: tells the configured
/// recipient that a task was reached.
pub struct TaskReachedHandler {
    sender: Arc<dyn NotificationSender>,
    recipient: String,
}

impl TaskReachedHandler {
    pub fn new(sender: Arc<dyn NotificationSender>, recipient: impl Into<String>) -> Self {
        Self {
            sender,
            recipient: recipient.into(),
        }
    }

    pub fn message_body(task_name: &str) -> String {
        format!("The task '{}' has been reached.", task_name)
    }

    /// Fire-and-forget: delivery failures are logged only.
    pub async fn on_task_reached(&self, task_name: &str) {
        let body = Self::message_body(task_name);
        if let Err(e) = self.sender.send(&self.recipient, task_name, &body).await {
            warn!(task = %task_name, error = ?e, "Failed to send task notification");
        }
    }
}
