use async_trait::async_trait;
use flowsync::runtime::notify::{NotificationSender, RecordingNotifier, TaskReachedHandler, TracingNotifier};
use std::sync::Arc;

struct UnreachableMailServer;

#[async_trait]
impl NotificationSender for UnreachableMailServer {
    async fn send(&self, _recipient: &str, _subject: &str, _body: &str) -> anyhow::Result<()> {
        anyhow::bail!("connection refused")
    }
}

#[tokio::test]
async fn test_task_reached_sends_notification() {
    let notifier = Arc::new(RecordingNotifier::new());
    let handler = TaskReachedHandler::new(notifier.clone(), "ops@example.com");

    handler.on_task_reached("Review request").await;

    let sent = notifier.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "ops@example.com");
    assert_eq!(sent[0].subject, "Review request");
    assert_eq!(sent[0].body, "The task 'Review request' has been reached.");
}

#[tokio::test]
async fn test_delivery_failure_is_swallowed() {
    let handler = TaskReachedHandler::new(Arc::new(UnreachableMailServer), "ops@example.com");
    handler.on_task_reached("Review request").await;

    let handler = TaskReachedHandler::new(Arc::new(TracingNotifier), "ops@example.com");
    handler.on_task_reached("Archive").await;
}
