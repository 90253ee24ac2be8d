//! Database models for notifications.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::str::FromStr;
use uuid::Uuid;

use fintrack_core::notifications::{NewNotification, Notification, NotificationType};

use crate::errors::StorageError;
use crate::utils::{format_instant, parse_timestamp};

#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::notifications)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct NotificationDB {
    pub id: String,
    pub user_id: String,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub metadata: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}

impl NotificationDB {
    pub fn from_new(
        new_notification: NewNotification,
        now: DateTime<Utc>,
    ) -> Result<Self, StorageError> {
        let metadata = new_notification
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StorageError::corrupt("notifications.metadata", e))?;
        Ok(Self {
            // v7 ids sort by creation time, which keeps same-instant rows ordered.
            id: Uuid::now_v7().to_string(),
            user_id: new_notification.user_id,
            notification_type: new_notification.notification_type.as_str().to_string(),
            title: new_notification.title,
            message: new_notification.message,
            metadata,
            is_read: false,
            created_at: format_instant(now),
        })
    }
}

impl TryFrom<NotificationDB> for Notification {
    type Error = StorageError;

    fn try_from(db: NotificationDB) -> Result<Self, Self::Error> {
        Ok(Self {
            notification_type: NotificationType::from_str(&db.notification_type)
                .map_err(|e| StorageError::corrupt("notifications.notification_type", e))?,
            metadata: db
                .metadata
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .map_err(|e| StorageError::corrupt("notifications.metadata", e))?,
            created_at: parse_timestamp(&db.created_at, "notifications.created_at")?,
            id: db.id,
            user_id: db.user_id,
            title: db.title,
            message: db.message,
            is_read: db.is_read,
        })
    }
}
