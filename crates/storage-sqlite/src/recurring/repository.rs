use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;

use fintrack_core::errors::{Error, Result};
use fintrack_core::recurring::{NewRecurringJob, RecurringJob, RecurringJobRepositoryTrait};
use fintrack_core::transactions::{NewTransaction, Transaction};

use super::model::RecurringJobDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::recurring_jobs;
use crate::transactions::insert_transaction;
use crate::utils::format_instant;

pub struct RecurringJobRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl RecurringJobRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    fn load_where<F>(&self, build: F) -> Result<Vec<RecurringJob>>
    where
        F: FnOnce(
            recurring_jobs::BoxedQuery<'static, diesel::sqlite::Sqlite>,
        ) -> recurring_jobs::BoxedQuery<'static, diesel::sqlite::Sqlite>,
    {
        let mut conn = get_connection(&self.pool)?;
        let rows = build(recurring_jobs::table.into_boxed())
            .select(RecurringJobDB::as_select())
            .load::<RecurringJobDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(|row| RecurringJob::try_from(row).map_err(Error::from))
            .collect()
    }
}

fn load_job(conn: &mut SqliteConnection, job_id: &str) -> Result<RecurringJob> {
    let row = recurring_jobs::table
        .find(job_id)
        .select(RecurringJobDB::as_select())
        .first::<RecurringJobDB>(conn)
        .optional()
        .map_err(StorageError::from)?
        .ok_or_else(|| Error::not_found("Recurring job", job_id))?;
    Ok(RecurringJob::try_from(row)?)
}

#[async_trait]
impl RecurringJobRepositoryTrait for RecurringJobRepository {
    async fn create(&self, new_job: NewRecurringJob) -> Result<RecurringJob> {
        let row = RecurringJobDB::from_new(new_job, Utc::now());
        self.writer
            .exec(move |conn| -> Result<RecurringJob> {
                let inserted = diesel::insert_into(recurring_jobs::table)
                    .values(&row)
                    .returning(RecurringJobDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Ok(RecurringJob::try_from(inserted)?)
            })
            .await
    }

    async fn update(&self, job: RecurringJob) -> Result<RecurringJob> {
        self.writer
            .exec(move |conn| -> Result<RecurringJob> {
                let changed = diesel::update(recurring_jobs::table.find(&job.id))
                    .set((
                        recurring_jobs::frequency.eq(job.frequency.as_str()),
                        recurring_jobs::next_run_at.eq(format_instant(job.next_run_at)),
                        recurring_jobs::is_active.eq(job.is_active),
                        recurring_jobs::updated_at.eq(format_instant(Utc::now())),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                if changed == 0 {
                    return Err(Error::not_found("Recurring job", &job.id));
                }
                load_job(conn, &job.id)
            })
            .await
    }

    async fn deactivate(&self, job_id: &str) -> Result<RecurringJob> {
        let job_id = job_id.to_string();
        self.writer
            .exec(move |conn| -> Result<RecurringJob> {
                let changed = diesel::update(recurring_jobs::table.find(&job_id))
                    .set((
                        recurring_jobs::is_active.eq(false),
                        recurring_jobs::updated_at.eq(format_instant(Utc::now())),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                if changed == 0 {
                    return Err(Error::not_found("Recurring job", &job_id));
                }
                load_job(conn, &job_id)
            })
            .await
    }

    async fn deactivate_by_template(&self, template_transaction_id: &str) -> Result<usize> {
        let template_id = template_transaction_id.to_string();
        self.writer
            .exec(move |conn| -> Result<usize> {
                Ok(diesel::update(
                    recurring_jobs::table
                        .filter(recurring_jobs::template_transaction_id.eq(template_id))
                        .filter(recurring_jobs::is_active.eq(true)),
                )
                .set((
                    recurring_jobs::is_active.eq(false),
                    recurring_jobs::updated_at.eq(format_instant(Utc::now())),
                ))
                .execute(conn)
                .map_err(StorageError::from)?)
            })
            .await
    }

    /// Inserts the materialized transaction and moves the schedule in one
    /// write transaction. A job that was paused, or whose `next_run_at` no
    /// longer matches, is left alone and nothing is written.
    async fn record_run(
        &self,
        job_id: &str,
        expected_next_run_at: DateTime<Utc>,
        materialized: NewTransaction,
        ran_at: DateTime<Utc>,
        next_run_at: DateTime<Utc>,
    ) -> Result<Transaction> {
        let job_id = job_id.to_string();
        self.writer
            .exec(move |conn| -> Result<Transaction> {
                let advanced = diesel::update(
                    recurring_jobs::table
                        .filter(recurring_jobs::id.eq(&job_id))
                        .filter(recurring_jobs::next_run_at.eq(format_instant(expected_next_run_at)))
                        .filter(recurring_jobs::is_active.eq(true)),
                )
                .set((
                    recurring_jobs::next_run_at.eq(format_instant(next_run_at)),
                    recurring_jobs::last_run_at.eq(Some(format_instant(ran_at))),
                    recurring_jobs::updated_at.eq(format_instant(Utc::now())),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;

                if advanced == 0 {
                    // Distinguish a vanished job from a lost race.
                    let current = load_job(conn, &job_id)?;
                    if !current.is_active {
                        return Err(Error::ConcurrencyConflict(format!(
                            "Recurring job '{}' was deactivated before it ran",
                            job_id
                        )));
                    }
                    return Err(Error::ConcurrencyConflict(format!(
                        "Recurring job '{}' already advanced past {}",
                        job_id,
                        format_instant(expected_next_run_at)
                    )));
                }
                insert_transaction(conn, materialized)
            })
            .await
    }

    async fn delete(&self, job_id: &str) -> Result<usize> {
        let job_id = job_id.to_string();
        self.writer
            .exec(move |conn| -> Result<usize> {
                Ok(diesel::delete(recurring_jobs::table.find(job_id))
                    .execute(conn)
                    .map_err(StorageError::from)?)
            })
            .await
    }

    fn get_by_id(&self, job_id: &str) -> Result<RecurringJob> {
        let mut conn = get_connection(&self.pool)?;
        load_job(&mut conn, job_id)
    }

    fn list_by_user(&self, user_id: &str) -> Result<Vec<RecurringJob>> {
        let user_id = user_id.to_string();
        self.load_where(|q| {
            q.filter(recurring_jobs::user_id.eq(user_id))
                .order(recurring_jobs::created_at.asc())
        })
    }

    fn find_by_template(
        &self,
        user_id: &str,
        template_transaction_id: &str,
    ) -> Result<Option<RecurringJob>> {
        let user_id = user_id.to_string();
        let template_id = template_transaction_id.to_string();
        let jobs = self.load_where(|q| {
            q.filter(recurring_jobs::user_id.eq(user_id))
                .filter(recurring_jobs::template_transaction_id.eq(template_id))
                .order(recurring_jobs::created_at.asc())
                .limit(1)
        })?;
        Ok(jobs.into_iter().next())
    }

    /// Active jobs with `next_run_at <= now`, oldest slot first.
    fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<RecurringJob>> {
        let cutoff = format_instant(now);
        self.load_where(|q| {
            q.filter(recurring_jobs::is_active.eq(true))
                .filter(recurring_jobs::next_run_at.le(cutoff))
                .order((recurring_jobs::next_run_at.asc(), recurring_jobs::id.asc()))
        })
    }
}
