//! Database models for recurring jobs.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::str::FromStr;
use uuid::Uuid;

use fintrack_core::recurring::{NewRecurringJob, RecurringFrequency, RecurringJob};

use crate::errors::StorageError;
use crate::utils::{format_instant, parse_optional_timestamp, parse_timestamp};

#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::recurring_jobs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RecurringJobDB {
    pub id: String,
    pub user_id: String,
    pub template_transaction_id: String,
    pub frequency: String,
    pub next_run_at: String,
    pub last_run_at: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl RecurringJobDB {
    /// A job without an explicit first execution is due immediately.
    pub fn from_new(new_job: NewRecurringJob, now: DateTime<Utc>) -> Self {
        let stamp = format_instant(now);
        Self {
            id: new_job.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            user_id: new_job.user_id,
            template_transaction_id: new_job.template_transaction_id,
            frequency: new_job.frequency.as_str().to_string(),
            next_run_at: format_instant(new_job.first_execution_at.unwrap_or(now)),
            last_run_at: None,
            is_active: true,
            created_at: stamp.clone(),
            updated_at: stamp,
        }
    }
}

impl TryFrom<RecurringJobDB> for RecurringJob {
    type Error = StorageError;

    fn try_from(db: RecurringJobDB) -> Result<Self, Self::Error> {
        Ok(Self {
            frequency: RecurringFrequency::from_str(&db.frequency)
                .map_err(|e| StorageError::corrupt("recurring_jobs.frequency", e))?,
            next_run_at: parse_timestamp(&db.next_run_at, "recurring_jobs.next_run_at")?,
            last_run_at: parse_optional_timestamp(
                db.last_run_at.as_deref(),
                "recurring_jobs.last_run_at",
            )?,
            created_at: parse_timestamp(&db.created_at, "recurring_jobs.created_at")?,
            updated_at: parse_timestamp(&db.updated_at, "recurring_jobs.updated_at")?,
            id: db.id,
            user_id: db.user_id,
            template_transaction_id: db.template_transaction_id,
            is_active: db.is_active,
        })
    }
}
