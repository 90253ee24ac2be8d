use tokio::sync::watch;

use fintrack_core::recurring::CancelFlag;
use fintrack_worker::config::Config;
use fintrack_worker::scheduler::start_recurring_scheduler;
use fintrack_worker::{build_state, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config);
    let state = build_state(&config).await?;

    let cancel = CancelFlag::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = start_recurring_scheduler(state, &config, cancel.clone(), shutdown_rx);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested, finishing the current batch");
    cancel.cancel();
    shutdown_tx.send(true)?;
    scheduler.await?;
    Ok(())
}
