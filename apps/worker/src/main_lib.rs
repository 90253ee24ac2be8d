use std::sync::Arc;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fintrack_core::budgets::{BudgetReconciler, BudgetService, BudgetServiceTrait};
use fintrack_core::notifications::{
    NotificationService, NotificationServiceTrait, NotificationSink,
};
use fintrack_core::recurring::{
    RecurringJobRunner, RecurringJobService, RecurringJobServiceTrait, RunnerConfig,
};
use fintrack_core::shared_wallets::{
    SettlementEngine, SharedWalletService, SharedWalletServiceTrait,
};
use fintrack_core::transactions::{
    TransactionChangeDispatcher, TransactionService, TransactionServiceTrait,
};
use fintrack_core::utils::KeyedLocks;
use fintrack_storage_sqlite::{
    self as db, BudgetRepository, NotificationRepository, RecurringJobRepository,
    SharedWalletRepository, TransactionRepository,
};

use crate::config::Config;

pub struct AppState {
    pub transaction_service: Arc<dyn TransactionServiceTrait>,
    pub budget_service: Arc<dyn BudgetServiceTrait>,
    pub shared_wallet_service: Arc<dyn SharedWalletServiceTrait>,
    pub recurring_job_service: Arc<dyn RecurringJobServiceTrait>,
    pub notification_service: Arc<dyn NotificationServiceTrait>,
    pub runner: Arc<RecurringJobRunner>,
    pub locks: Arc<KeyedLocks>,
    pub db_path: String,
}

pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    // Keep DATABASE_URL aligned with FT_DB_PATH so storage opens the same file
    std::env::set_var("DATABASE_URL", &config.db_path);
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = db::spawn_writer((*pool).clone());

    let transaction_repo = Arc::new(TransactionRepository::new(pool.clone(), writer.clone()));
    let budget_repo = Arc::new(BudgetRepository::new(pool.clone(), writer.clone()));
    let job_repo = Arc::new(RecurringJobRepository::new(pool.clone(), writer.clone()));
    let wallet_repo = Arc::new(SharedWalletRepository::new(pool.clone(), writer.clone()));
    let notification_repo = Arc::new(NotificationRepository::new(pool.clone(), writer));

    let notification_service = Arc::new(NotificationService::new(notification_repo));
    let sink: Arc<dyn NotificationSink> = notification_service.clone();
    let locks = Arc::new(KeyedLocks::new());

    let reconciler = Arc::new(BudgetReconciler::new(
        budget_repo.clone(),
        transaction_repo.clone(),
        sink.clone(),
        locks.clone(),
    ));
    let settlement = Arc::new(SettlementEngine::new(
        wallet_repo.clone(),
        transaction_repo.clone(),
        locks.clone(),
    ));
    let dispatcher = Arc::new(TransactionChangeDispatcher::new(
        reconciler.clone(),
        settlement.clone(),
    ));

    let transaction_service = Arc::new(TransactionService::new(
        transaction_repo.clone(),
        wallet_repo.clone(),
        job_repo.clone(),
        dispatcher.clone(),
    ));
    let budget_service = Arc::new(BudgetService::new(budget_repo, reconciler));
    let shared_wallet_service = Arc::new(SharedWalletService::new(
        wallet_repo,
        settlement,
        sink.clone(),
        locks.clone(),
    ));
    let recurring_job_service = Arc::new(RecurringJobService::new(
        job_repo.clone(),
        transaction_repo.clone(),
    ));
    let runner = Arc::new(RecurringJobRunner::new(
        job_repo,
        transaction_repo,
        dispatcher,
        sink,
        RunnerConfig {
            max_concurrent_users: config.runner_max_concurrency,
        },
    ));

    Ok(Arc::new(AppState {
        transaction_service,
        budget_service,
        shared_wallet_service,
        recurring_job_service,
        notification_service,
        runner,
        locks,
        db_path,
    }))
}
