//! Background scheduler for the recurring job runner.
//!
//! Batches never overlap: each tick awaits the previous batch, and ticks
//! missed while a batch was running are skipped.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use fintrack_core::recurring::{CancelFlag, RunReport};

use crate::config::Config;
use crate::main_lib::AppState;

/// Starts the runner loop. Sending `true` on `shutdown` stops it once the
/// batch in flight (if any) has finished; `cancel` is shared with that batch
/// so it starts no further job.
pub fn start_recurring_scheduler(
    state: Arc<AppState>,
    config: &Config,
    cancel: CancelFlag,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let initial_delay = config.runner_initial_delay;
    let period = config.runner_interval;
    tokio::spawn(async move {
        info!(
            "Recurring job scheduler started ({}s interval)",
            period.as_secs()
        );

        tokio::select! {
            _ = tokio::time::sleep(initial_delay) => {}
            _ = shutdown.changed() => {
                info!("Recurring job scheduler stopped before its first run");
                return;
            }
        }

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }
            if cancel.is_cancelled() || *shutdown.borrow() {
                break;
            }
            run_scheduled_batch(&state, &cancel).await;
        }
        info!("Recurring job scheduler stopped");
    })
}

/// Runs one batch of due jobs as of now.
pub async fn run_scheduled_batch(state: &AppState, cancel: &CancelFlag) -> Option<RunReport> {
    let now = Utc::now();
    debug!("Checking recurring jobs due at {}", now);
    let result = state.runner.run_due_jobs_with_cancel(now, cancel).await;
    state.locks.prune();
    match result {
        Ok(report) => {
            if report.failed_count() > 0 || report.deactivated_count() > 0 {
                warn!(
                    "Recurring batch had {} failed and {} deactivated job(s)",
                    report.failed_count(),
                    report.deactivated_count()
                );
            } else if report.materialized_count() > 0 {
                info!(
                    "Recurring batch materialized {} transaction(s)",
                    report.materialized_count()
                );
            }
            Some(report)
        }
        Err(e) => {
            error!("Recurring batch could not start: {}", e);
            None
        }
    }
}
