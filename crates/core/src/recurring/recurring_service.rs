use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;

use super::recurring_model::{NewRecurringJob, RecurringJob, RecurringJobUpdate};
use super::recurring_traits::{RecurringJobRepositoryTrait, RecurringJobServiceTrait};
use super::schedule::advance_past;
use crate::errors::{Error, Result, ValidationError};
use crate::transactions::TransactionRepositoryTrait;

/// Service for managing recurring jobs.
pub struct RecurringJobService {
    repository: Arc<dyn RecurringJobRepositoryTrait>,
    transaction_repository: Arc<dyn TransactionRepositoryTrait>,
}

impl RecurringJobService {
    pub fn new(
        repository: Arc<dyn RecurringJobRepositoryTrait>,
        transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    ) -> Self {
        Self {
            repository,
            transaction_repository,
        }
    }
}

fn ensure_after_last_run(job: &RecurringJob) -> Result<()> {
    if let Some(last_run_at) = job.last_run_at {
        if job.next_run_at <= last_run_at {
            return Err(Error::invalid_input(format!(
                "Next run {} must be after the last run {}",
                job.next_run_at, last_run_at
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl RecurringJobServiceTrait for RecurringJobService {
    async fn create_job(&self, new_job: NewRecurringJob) -> Result<RecurringJob> {
        new_job.validate()?;
        let template = self
            .transaction_repository
            .get_by_id(&new_job.template_transaction_id)?;
        if template.user_id != new_job.user_id {
            return Err(Error::invalid_input(format!(
                "Transaction {} does not belong to user {}",
                template.id, new_job.user_id
            )));
        }
        if self
            .repository
            .find_by_template(&new_job.user_id, &new_job.template_transaction_id)?
            .is_some()
        {
            return Err(ValidationError::Duplicate(format!(
                "A recurring job already exists for transaction {}",
                new_job.template_transaction_id
            ))
            .into());
        }

        let new_job = NewRecurringJob {
            first_execution_at: Some(new_job.first_execution_at.unwrap_or_else(Utc::now)),
            ..new_job
        };
        let job = self.repository.create(new_job).await?;
        debug!(
            "Created {} recurring job {} on template {}, first run {}",
            job.frequency, job.id, job.template_transaction_id, job.next_run_at
        );
        Ok(job)
    }

    async fn update_job(&self, job_id: &str, update: RecurringJobUpdate) -> Result<RecurringJob> {
        let existing = self.repository.get_by_id(job_id)?;
        let updated = update.apply_to(&existing);
        ensure_after_last_run(&updated)?;
        self.repository.update(updated).await
    }

    async fn pause_job(&self, job_id: &str) -> Result<RecurringJob> {
        let job = self.repository.get_by_id(job_id)?;
        if !job.is_active {
            return Ok(job);
        }
        self.repository.deactivate(job_id).await
    }

    async fn resume_job(&self, job_id: &str, now: DateTime<Utc>) -> Result<RecurringJob> {
        let mut job = self.repository.get_by_id(job_id)?;
        if self
            .transaction_repository
            .find_by_id(&job.template_transaction_id)?
            .is_none()
        {
            return Err(Error::invalid_input(format!(
                "Recurring job {} cannot resume: its template transaction was deleted",
                job_id
            )));
        }
        job.is_active = true;
        if job.next_run_at <= now {
            job.next_run_at = advance_past(job.frequency, job.next_run_at, now)?;
        }
        self.repository.update(job).await
    }

    async fn delete_job(&self, job_id: &str) -> Result<()> {
        if self.repository.delete(job_id).await? == 0 {
            return Err(Error::not_found("Recurring job", job_id));
        }
        Ok(())
    }

    fn get_job(&self, job_id: &str) -> Result<RecurringJob> {
        self.repository.get_by_id(job_id)
    }

    fn list_jobs(&self, user_id: &str) -> Result<Vec<RecurringJob>> {
        self.repository.list_by_user(user_id)
    }
}
