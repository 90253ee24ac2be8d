//! Notification sink trait and implementations.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use log::warn;

use super::notifications_model::NotificationType;
use crate::errors::{Error, Result};

/// Receiver for user-facing alerts raised by the finance core.
///
/// Delivery is best-effort: callers log a failed `notify` and carry on, so
/// a broken sink never rolls back the ledger change that raised the alert.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(
        &self,
        user_id: &str,
        notification_type: NotificationType,
        title: &str,
        message: &str,
    ) -> Result<()>;
}

/// Sends through `sink`, logging instead of propagating a failure.
pub async fn notify_best_effort(
    sink: &dyn NotificationSink,
    user_id: &str,
    notification_type: NotificationType,
    title: &str,
    message: &str,
) {
    if let Err(e) = sink.notify(user_id, notification_type, title, message).await {
        warn!(
            "Failed to deliver {} notification to user {}: {}",
            notification_type, user_id, e
        );
    }
}

/// Discards every notification.
#[derive(Clone, Default)]
pub struct NoOpNotificationSink;

#[async_trait]
impl NotificationSink for NoOpNotificationSink {
    async fn notify(
        &self,
        _user_id: &str,
        _notification_type: NotificationType,
        _title: &str,
        _message: &str,
    ) -> Result<()> {
        Ok(())
    }
}

/// A notification captured by [`MockNotificationSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub user_id: String,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
}

/// Mock sink for testing - collects sent notifications.
#[derive(Clone, Default)]
pub struct MockNotificationSink {
    sent: Arc<Mutex<Vec<SentNotification>>>,
    failing: bool,
}

impl MockNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every `notify` call fails.
    pub fn failing() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            failing: true,
        }
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_of_type(&self, notification_type: NotificationType) -> Vec<SentNotification> {
        self.sent()
            .into_iter()
            .filter(|n| n.notification_type == notification_type)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl NotificationSink for MockNotificationSink {
    async fn notify(
        &self,
        user_id: &str,
        notification_type: NotificationType,
        title: &str,
        message: &str,
    ) -> Result<()> {
        if self.failing {
            return Err(Error::Unexpected("notification delivery failed".into()));
        }
        self.sent.lock().unwrap().push(SentNotification {
            user_id: user_id.to_string(),
            notification_type,
            title: title.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_sink_accepts_everything() {
        let sink = NoOpNotificationSink;
        assert!(sink
            .notify("u1", NotificationType::BudgetThreshold, "t", "m")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_mock_sink_collects_notifications() {
        let sink = MockNotificationSink::new();
        assert!(sink.is_empty());

        sink.notify("u1", NotificationType::BudgetThreshold, "Food", "80%")
            .await
            .unwrap();
        sink.notify("u1", NotificationType::BudgetExceeded, "Food", "110%")
            .await
            .unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.sent_of_type(NotificationType::BudgetExceeded).len(), 1);

        sink.clear();
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_best_effort_swallows_failures() {
        let sink = MockNotificationSink::failing();
        notify_best_effort(&sink, "u1", NotificationType::RecurringJobFailed, "t", "m").await;
        assert!(sink.is_empty());
    }
}
