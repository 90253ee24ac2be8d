//! Recurring job repository and service traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::recurring_model::{NewRecurringJob, RecurringJob, RecurringJobUpdate};
use crate::errors::Result;
use crate::transactions::{NewTransaction, Transaction};

/// Persistence contract for recurring jobs.
#[async_trait]
pub trait RecurringJobRepositoryTrait: Send + Sync {
    /// Inserts an active job due at `first_execution_at`, which the caller
    /// has already resolved.
    async fn create(&self, new_job: NewRecurringJob) -> Result<RecurringJob>;

    /// Persists frequency, next run and active flag.
    async fn update(&self, job: RecurringJob) -> Result<RecurringJob>;

    async fn deactivate(&self, job_id: &str) -> Result<RecurringJob>;

    /// Deactivates every job built on `template_transaction_id`.
    async fn deactivate_by_template(&self, template_transaction_id: &str) -> Result<usize>;

    /// Inserts the materialized transaction and moves the job to
    /// `next_run_at` in one store transaction.
    ///
    /// Fails with `Error::ConcurrencyConflict`, writing nothing, when the
    /// job's stored `next_run_at` no longer equals `expected_next_run_at`.
    async fn record_run(
        &self,
        job_id: &str,
        expected_next_run_at: DateTime<Utc>,
        materialized: NewTransaction,
        ran_at: DateTime<Utc>,
        next_run_at: DateTime<Utc>,
    ) -> Result<Transaction>;

    async fn delete(&self, job_id: &str) -> Result<usize>;

    fn get_by_id(&self, job_id: &str) -> Result<RecurringJob>;

    fn list_by_user(&self, user_id: &str) -> Result<Vec<RecurringJob>>;

    fn find_by_template(
        &self,
        user_id: &str,
        template_transaction_id: &str,
    ) -> Result<Option<RecurringJob>>;

    /// Active jobs with `next_run_at <= now`, earliest first.
    fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<RecurringJob>>;
}

#[async_trait]
pub trait RecurringJobServiceTrait: Send + Sync {
    async fn create_job(&self, new_job: NewRecurringJob) -> Result<RecurringJob>;

    async fn update_job(&self, job_id: &str, update: RecurringJobUpdate) -> Result<RecurringJob>;

    async fn pause_job(&self, job_id: &str) -> Result<RecurringJob>;

    /// Reactivates a job. A `next_run_at` left in the past is moved to the
    /// first slot after `now`, so a resume never back-fills.
    async fn resume_job(&self, job_id: &str, now: DateTime<Utc>) -> Result<RecurringJob>;

    async fn delete_job(&self, job_id: &str) -> Result<()>;

    fn get_job(&self, job_id: &str) -> Result<RecurringJob>;

    fn list_jobs(&self, user_id: &str) -> Result<Vec<RecurringJob>>;
}
