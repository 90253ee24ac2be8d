//! Periodic materialization of due recurring jobs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};

use super::recurring_model::{JobRunOutcome, JobRunStatus, RecurringJob, RunReport};
use super::recurring_traits::RecurringJobRepositoryTrait;
use super::schedule::next_run_at;
use crate::constants::DEFAULT_RUNNER_CONCURRENCY;
use crate::errors::{Error, Result};
use crate::notifications::{notify_best_effort, NotificationSink, NotificationType};
use crate::transactions::{
    ChangeKind, NewTransaction, Transaction, TransactionChangeHandlerTrait,
    TransactionRepositoryTrait,
};

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Owners whose jobs run at the same time. Jobs of one owner always run
    /// one after another.
    pub max_concurrent_users: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_users: DEFAULT_RUNNER_CONCURRENCY,
        }
    }
}

/// Cooperative cancellation for a runner batch. Jobs already started are
/// finished; no further job is started once cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct RecurringJobRunner {
    job_repository: Arc<dyn RecurringJobRepositoryTrait>,
    transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    change_handler: Arc<dyn TransactionChangeHandlerTrait>,
    notification_sink: Arc<dyn NotificationSink>,
    config: RunnerConfig,
}

impl RecurringJobRunner {
    pub fn new(
        job_repository: Arc<dyn RecurringJobRepositoryTrait>,
        transaction_repository: Arc<dyn TransactionRepositoryTrait>,
        change_handler: Arc<dyn TransactionChangeHandlerTrait>,
        notification_sink: Arc<dyn NotificationSink>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            job_repository,
            transaction_repository,
            change_handler,
            notification_sink,
            config,
        }
    }

    pub async fn run_due_jobs(&self, now: DateTime<Utc>) -> Result<RunReport> {
        self.run_due_jobs_with_cancel(now, &CancelFlag::new()).await
    }

    /// Runs every job due at `now`.
    ///
    /// Only a failure to list the due jobs fails the batch; each job's own
    /// failure is recorded in the report.
    pub async fn run_due_jobs_with_cancel(
        &self,
        now: DateTime<Utc>,
        cancel: &CancelFlag,
    ) -> Result<RunReport> {
        let started_at = Utc::now();
        let due = self.job_repository.list_due(now)?;
        if !due.is_empty() {
            info!("Running {} due recurring job(s) as of {}", due.len(), now);
        }

        let groups = group_by_owner(due);
        let results: Vec<(Vec<JobRunOutcome>, usize)> = stream::iter(groups)
            .map(|jobs| self.run_owner_jobs(jobs, now, cancel))
            .buffer_unordered(self.config.max_concurrent_users.max(1))
            .collect()
            .await;

        let mut outcomes = Vec::new();
        let mut unprocessed = 0;
        for (group_outcomes, skipped) in results {
            outcomes.extend(group_outcomes);
            unprocessed += skipped;
        }
        outcomes.sort_by(|a, b| {
            a.scheduled_for
                .cmp(&b.scheduled_for)
                .then_with(|| a.job_id.cmp(&b.job_id))
        });

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            outcomes,
            cancelled: cancel.is_cancelled(),
            unprocessed,
        };
        if !report.outcomes.is_empty() || report.cancelled {
            info!(
                "Recurring batch done: {} materialized, {} failed, {} deactivated, {} left unprocessed",
                report.materialized_count(),
                report.failed_count(),
                report.deactivated_count(),
                report.unprocessed
            );
        }
        Ok(report)
    }

    /// Runs one owner's jobs in due order. Returns the outcomes and the
    /// number of jobs skipped after cancellation.
    async fn run_owner_jobs(
        &self,
        jobs: Vec<RecurringJob>,
        now: DateTime<Utc>,
        cancel: &CancelFlag,
    ) -> (Vec<JobRunOutcome>, usize) {
        let mut outcomes = Vec::with_capacity(jobs.len());
        for (index, job) in jobs.iter().enumerate() {
            if cancel.is_cancelled() {
                return (outcomes, jobs.len() - index);
            }
            outcomes.push(self.run_job(job, now).await);
        }
        (outcomes, 0)
    }

    async fn run_job(&self, job: &RecurringJob, now: DateTime<Utc>) -> JobRunOutcome {
        let status = match self.materialize(job, now).await {
            Ok((transaction, next_run_at)) => {
                debug!(
                    "Job {} materialized transaction {}, next run {}",
                    job.id, transaction.id, next_run_at
                );
                self.change_handler
                    .on_transaction_changed(&transaction, None, ChangeKind::Created)
                    .await;
                JobRunStatus::Materialized {
                    transaction_id: transaction.id,
                    next_run_at,
                }
            }
            Err(e @ Error::FatalJob(_)) => {
                warn!("Deactivating recurring job {}: {}", job.id, e);
                if let Err(deactivate_err) = self.job_repository.deactivate(&job.id).await {
                    error!(
                        "Failed to deactivate recurring job {}: {}",
                        job.id, deactivate_err
                    );
                }
                notify_best_effort(
                    self.notification_sink.as_ref(),
                    &job.user_id,
                    NotificationType::RecurringJobDeactivated,
                    "Recurring transaction stopped",
                    &format!(
                        "Your {} recurring transaction was turned off: {}",
                        job.frequency.as_str().to_lowercase(),
                        e
                    ),
                )
                .await;
                JobRunStatus::Deactivated {
                    error: e.to_string(),
                }
            }
            Err(e) if e.is_concurrency_conflict() => {
                // Another batch advanced the job first.
                debug!("Recurring job {} was already run: {}", job.id, e);
                JobRunStatus::Failed {
                    error: e.to_string(),
                }
            }
            Err(e) => {
                warn!("Recurring job {} failed, will retry: {}", job.id, e);
                notify_best_effort(
                    self.notification_sink.as_ref(),
                    &job.user_id,
                    NotificationType::RecurringJobFailed,
                    "Recurring transaction delayed",
                    &format!(
                        "Your {} recurring transaction could not be created and will be retried.",
                        job.frequency.as_str().to_lowercase()
                    ),
                )
                .await;
                JobRunStatus::Failed {
                    error: e.to_string(),
                }
            }
        };

        JobRunOutcome {
            job_id: job.id.clone(),
            user_id: job.user_id.clone(),
            scheduled_for: job.next_run_at,
            status,
        }
    }

    /// Copies the template and commits it together with the advanced
    /// schedule. Conditions that can never succeed are `Error::FatalJob`.
    async fn materialize(
        &self,
        job: &RecurringJob,
        now: DateTime<Utc>,
    ) -> Result<(Transaction, DateTime<Utc>)> {
        let template = self
            .transaction_repository
            .find_by_id(&job.template_transaction_id)?
            .ok_or_else(|| {
                Error::FatalJob(format!(
                    "template transaction {} no longer exists",
                    job.template_transaction_id
                ))
            })?;

        let materialized =
            NewTransaction::from_template(&template, &job.user_id, now.date_naive()).normalized();
        materialized.validate().map_err(|e| {
            Error::FatalJob(format!(
                "template transaction {} is not valid: {}",
                template.id, e
            ))
        })?;
        // The run instant becomes last_run_at; the next slot counts from it.
        let next_run_at = next_run_at(job.frequency, now)
            .map_err(|e| Error::FatalJob(format!("schedule cannot advance: {}", e)))?;

        let transaction = self
            .job_repository
            .record_run(&job.id, job.next_run_at, materialized, now, next_run_at)
            .await?;
        Ok((transaction, next_run_at))
    }
}

/// Splits due jobs per owner, keeping due order within and across groups.
fn group_by_owner(jobs: Vec<RecurringJob>) -> Vec<Vec<RecurringJob>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<RecurringJob>> = Vec::new();
    for job in jobs {
        match index.get(&job.user_id) {
            Some(&i) => groups[i].push(job),
            None => {
                index.insert(job.user_id.clone(), groups.len());
                groups.push(vec![job]);
            }
        }
    }
    groups
}
