use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use super::notifications_model::{NewNotification, Notification, NotificationType};
use super::notifications_traits::{NotificationRepositoryTrait, NotificationServiceTrait};
use super::sink::NotificationSink;
use crate::errors::{Error, Result};

/// Stores notifications and doubles as the production [`NotificationSink`].
pub struct NotificationService {
    repository: Arc<dyn NotificationRepositoryTrait>,
}

impl NotificationService {
    pub fn new(repository: Arc<dyn NotificationRepositoryTrait>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl NotificationServiceTrait for NotificationService {
    async fn create_notification(
        &self,
        new_notification: NewNotification,
    ) -> Result<Notification> {
        new_notification.validate()?;
        debug!(
            "Storing {} notification for user {}",
            new_notification.notification_type, new_notification.user_id
        );
        self.repository.create(new_notification).await
    }

    fn list_notifications(&self, user_id: &str, unread_only: bool) -> Result<Vec<Notification>> {
        self.repository.list_by_user(user_id, unread_only)
    }

    fn unread_count(&self, user_id: &str) -> Result<usize> {
        Ok(self.repository.list_by_user(user_id, true)?.len())
    }

    async fn mark_read(&self, notification_id: &str) -> Result<()> {
        if self.repository.mark_read(notification_id).await? == 0 {
            return Err(Error::not_found("Notification", notification_id));
        }
        Ok(())
    }

    async fn mark_all_read(&self, user_id: &str) -> Result<usize> {
        self.repository.mark_all_read(user_id).await
    }

    async fn delete_notification(&self, notification_id: &str) -> Result<()> {
        if self.repository.delete(notification_id).await? == 0 {
            return Err(Error::not_found("Notification", notification_id));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for NotificationService {
    async fn notify(
        &self,
        user_id: &str,
        notification_type: NotificationType,
        title: &str,
        message: &str,
    ) -> Result<()> {
        self.create_notification(NewNotification::new(
            user_id,
            notification_type,
            title,
            message,
        ))
        .await
        .map(|_| ())
    }
}
