//! Recurring module - schedules that materialize copies of a template
//! transaction.

mod recurring_model;
mod recurring_service;
mod recurring_traits;
mod runner;
mod schedule;


pub use recurring_model::{
    JobRunOutcome, JobRunStatus, NewRecurringJob, RecurringJob, RecurringJobUpdate, RunReport,
};
pub use recurring_service::RecurringJobService;
pub use recurring_traits::{RecurringJobRepositoryTrait, RecurringJobServiceTrait};
pub use runner::{CancelFlag, RecurringJobRunner, RunnerConfig};
pub use schedule::{advance_past, next_run_at, RecurringFrequency};
