//! Notification repository and service traits.

use async_trait::async_trait;

use super::notifications_model::{NewNotification, Notification};
use crate::errors::Result;

/// Persistence contract for user notifications.
#[async_trait]
pub trait NotificationRepositoryTrait: Send + Sync {
    async fn create(&self, new_notification: NewNotification) -> Result<Notification>;

    /// Lists a user's notifications, newest first.
    fn list_by_user(&self, user_id: &str, unread_only: bool) -> Result<Vec<Notification>>;

    /// Marks one notification as read. Returns the number of updated rows.
    async fn mark_read(&self, notification_id: &str) -> Result<usize>;

    /// Marks all of a user's notifications as read.
    async fn mark_all_read(&self, user_id: &str) -> Result<usize>;

    async fn delete(&self, notification_id: &str) -> Result<usize>;
}

#[async_trait]
pub trait NotificationServiceTrait: Send + Sync {
    async fn create_notification(&self, new_notification: NewNotification)
        -> Result<Notification>;

    fn list_notifications(&self, user_id: &str, unread_only: bool) -> Result<Vec<Notification>>;

    fn unread_count(&self, user_id: &str) -> Result<usize>;

    async fn mark_read(&self, notification_id: &str) -> Result<()>;

    async fn mark_all_read(&self, user_id: &str) -> Result<usize>;

    async fn delete_notification(&self, notification_id: &str) -> Result<()>;
}
