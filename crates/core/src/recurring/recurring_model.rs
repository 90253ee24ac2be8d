//! Recurring job domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::schedule::RecurringFrequency;
use crate::errors::{Error, Result};

/// A schedule that materializes a copy of a template transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringJob {
    pub id: String,
    pub user_id: String,
    /// Weak reference; the template may have been deleted since.
    pub template_transaction_id: String,
    pub frequency: RecurringFrequency,
    pub next_run_at: DateTime<Utc>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurringJob {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.next_run_at <= now
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecurringJob {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    pub template_transaction_id: String,
    pub frequency: RecurringFrequency,
    /// First execution instant; "now" when absent.
    pub first_execution_at: Option<DateTime<Utc>>,
}

impl NewRecurringJob {
    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(Error::invalid_input("Recurring job user cannot be empty"));
        }
        if self.template_transaction_id.trim().is_empty() {
            return Err(Error::invalid_input(
                "Recurring job template transaction cannot be empty",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringJobUpdate {
    pub frequency: Option<RecurringFrequency>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

impl RecurringJobUpdate {
    pub fn apply_to(&self, job: &RecurringJob) -> RecurringJob {
        let mut updated = job.clone();
        if let Some(frequency) = self.frequency {
            updated.frequency = frequency;
        }
        if let Some(next_run_at) = self.next_run_at {
            updated.next_run_at = next_run_at;
        }
        if let Some(is_active) = self.is_active {
            updated.is_active = is_active;
        }
        updated
    }
}

/// How one job fared in a runner batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "status",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum JobRunStatus {
    Materialized {
        transaction_id: String,
        next_run_at: DateTime<Utc>,
    },
    /// Transient failure; the schedule is untouched and the job retried.
    Failed { error: String },
    /// Permanent failure; the job was switched off.
    Deactivated { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRunOutcome {
    pub job_id: String,
    pub user_id: String,
    pub scheduled_for: DateTime<Utc>,
    #[serde(flatten)]
    pub status: JobRunStatus,
}

impl JobRunOutcome {
    pub fn is_materialized(&self) -> bool {
        matches!(self.status, JobRunStatus::Materialized { .. })
    }
}

/// Summary of one runner batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Ordered by scheduled instant, then job id.
    pub outcomes: Vec<JobRunOutcome>,
    pub cancelled: bool,
    /// Due jobs that were never started because the batch was cancelled.
    pub unprocessed: usize,
}

impl RunReport {
    fn count(&self, pred: impl Fn(&JobRunStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }

    pub fn materialized_count(&self) -> usize {
        self.count(|s| matches!(s, JobRunStatus::Materialized { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|s| matches!(s, JobRunStatus::Failed { .. }))
    }

    pub fn deactivated_count(&self) -> usize {
        self.count(|s| matches!(s, JobRunStatus::Deactivated { .. }))
    }

    pub fn outcome_for(&self, job_id: &str) -> Option<&JobRunOutcome> {
        self.outcomes.iter().find(|o| o.job_id == job_id)
    }
}
