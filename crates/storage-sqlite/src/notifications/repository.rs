use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;

use fintrack_core::errors::{Error, Result};
use fintrack_core::notifications::{NewNotification, Notification, NotificationRepositoryTrait};

use super::model::NotificationDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::notifications;

pub struct NotificationRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl NotificationRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl NotificationRepositoryTrait for NotificationRepository {
    async fn create(&self, new_notification: NewNotification) -> Result<Notification> {
        let row = NotificationDB::from_new(new_notification, Utc::now())?;
        self.writer
            .exec(move |conn| -> Result<Notification> {
                let inserted = diesel::insert_into(notifications::table)
                    .values(&row)
                    .returning(NotificationDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Ok(Notification::try_from(inserted)?)
            })
            .await
    }

    /// Newest first.
    fn list_by_user(&self, user_id: &str, unread_only: bool) -> Result<Vec<Notification>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = notifications::table
            .filter(notifications::user_id.eq(user_id))
            .into_boxed();
        if unread_only {
            query = query.filter(notifications::is_read.eq(false));
        }
        let rows = query
            .order((notifications::created_at.desc(), notifications::id.desc()))
            .select(NotificationDB::as_select())
            .load::<NotificationDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(|row| Notification::try_from(row).map_err(Error::from))
            .collect()
    }

    async fn mark_read(&self, notification_id: &str) -> Result<usize> {
        let notification_id = notification_id.to_string();
        self.writer
            .exec(move |conn| -> Result<usize> {
                Ok(diesel::update(notifications::table.find(notification_id))
                    .set(notifications::is_read.eq(true))
                    .execute(conn)
                    .map_err(StorageError::from)?)
            })
            .await
    }

    async fn mark_all_read(&self, user_id: &str) -> Result<usize> {
        let user_id = user_id.to_string();
        self.writer
            .exec(move |conn| -> Result<usize> {
                Ok(diesel::update(
                    notifications::table
                        .filter(notifications::user_id.eq(user_id))
                        .filter(notifications::is_read.eq(false)),
                )
                .set(notifications::is_read.eq(true))
                .execute(conn)
                .map_err(StorageError::from)?)
            })
            .await
    }

    async fn delete(&self, notification_id: &str) -> Result<usize> {
        let notification_id = notification_id.to_string();
        self.writer
            .exec(move |conn| -> Result<usize> {
                Ok(diesel::delete(notifications::table.find(notification_id))
                    .execute(conn)
                    .map_err(StorageError::from)?)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;
    use fintrack_core::notifications::NotificationType;
    use serde_json::json;

    #[tokio::test]
    async fn test_inbox_lifecycle() {
        let db = test_db();
        let repo = NotificationRepository::new(db.pool.clone(), db.writer.clone());

        let first = repo
            .create(
                NewNotification::new(
                    "u1",
                    NotificationType::BudgetThreshold,
                    "Budget alert",
                    "Food reached 80%",
                )
                .with_metadata(json!({ "budgetId": "b1" })),
            )
            .await
            .unwrap();
        let second = repo
            .create(NewNotification::new(
                "u1",
                NotificationType::RecurringJobFailed,
                "Recurring transaction delayed",
                "Will retry",
            ))
            .await
            .unwrap();
        repo.create(NewNotification::new(
            "u2",
            NotificationType::BudgetExceeded,
            "Over budget",
            "Rent",
        ))
        .await
        .unwrap();

        let inbox = repo.list_by_user("u1", false).unwrap();
        let ids: Vec<_> = inbox.iter().map(|n| n.id.clone()).collect();
        assert_eq!(ids, vec![second.id.clone(), first.id.clone()]);
        assert_eq!(inbox[1].metadata, Some(json!({ "budgetId": "b1" })));

        assert_eq!(repo.mark_read(&first.id).await.unwrap(), 1);
        assert_eq!(repo.list_by_user("u1", true).unwrap().len(), 1);
        assert_eq!(repo.mark_all_read("u1").await.unwrap(), 1);
        assert!(repo.list_by_user("u1", true).unwrap().is_empty());
        assert_eq!(repo.list_by_user("u2", true).unwrap().len(), 1);

        assert_eq!(repo.delete(&second.id).await.unwrap(), 1);
        assert_eq!(repo.delete(&second.id).await.unwrap(), 0);
    }
}
