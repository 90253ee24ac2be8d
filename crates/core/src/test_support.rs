//! In-memory repositories and a wired service graph for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::budgets::{Budget, BudgetReconciler, BudgetRepositoryTrait, BudgetService, NewBudget};
use crate::errors::{Error, Result, ValidationError};
use crate::notifications::{
    MockNotificationSink, NewNotification, Notification, NotificationRepositoryTrait,
};
use crate::recurring::{
    NewRecurringJob, RecurringJob, RecurringJobRepositoryTrait, RecurringJobRunner,
    RecurringJobService, RunnerConfig,
};
use crate::shared_wallets::{
    MemberBalanceUpdate, NewSharedWallet, NewWalletMember, SettlementEngine, SharedWallet,
    SharedWalletMember, SharedWalletRepositoryTrait, SharedWalletService,
};
use crate::transactions::{
    NewTransaction, Transaction, TransactionChangeDispatcher, TransactionFilter,
    TransactionRepositoryTrait, TransactionService, TransactionType,
};
use crate::utils::KeyedLocks;

pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn new_expense(user_id: &str, category: &str, amount: Decimal, event_date: NaiveDate) -> NewTransaction {
    NewTransaction {
        id: None,
        user_id: user_id.to_string(),
        shared_wallet_id: None,
        title: format!("{} expense", category),
        amount,
        currency: None,
        category: category.to_string(),
        transaction_type: TransactionType::Expense,
        event_date,
        note: None,
        attachment_url: None,
    }
}

fn conflict(entity: &str, id: &str) -> Error {
    Error::ConcurrencyConflict(format!("{} '{}' was modified concurrently", entity, id))
}

// =========================================================================
// Transactions
// =========================================================================

#[derive(Clone, Default)]
pub struct InMemoryTransactionRepository {
    rows: Arc<Mutex<Vec<Transaction>>>,
    fail_on_create: Arc<AtomicBool>,
}

impl InMemoryTransactionRepository {
    pub fn set_fail_on_create(&self, fail: bool) {
        self.fail_on_create.store(fail, Ordering::SeqCst);
    }

    pub fn all(&self) -> Vec<Transaction> {
        self.rows.lock().unwrap().clone()
    }

    pub fn insert(&self, new_transaction: NewTransaction) -> Result<Transaction> {
        if self.fail_on_create.load(Ordering::SeqCst) {
            return Err(Error::Unexpected("Intentional create failure".into()));
        }
        let now = Utc::now();
        let currency = new_transaction.currency_or_default();
        let transaction = Transaction {
            id: new_transaction
                .id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            user_id: new_transaction.user_id,
            shared_wallet_id: new_transaction.shared_wallet_id,
            title: new_transaction.title,
            amount: new_transaction.amount,
            currency,
            category: new_transaction.category,
            transaction_type: new_transaction.transaction_type,
            event_date: new_transaction.event_date,
            note: new_transaction.note,
            attachment_url: new_transaction.attachment_url,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(transaction.clone());
        Ok(transaction)
    }

    fn detach_wallet(&self, wallet_id: &str) {
        for row in self.rows.lock().unwrap().iter_mut() {
            if row.shared_wallet_id.as_deref() == Some(wallet_id) {
                row.shared_wallet_id = None;
            }
        }
    }
}

#[async_trait]
impl TransactionRepositoryTrait for InMemoryTransactionRepository {
    async fn create(&self, new_transaction: NewTransaction) -> Result<Transaction> {
        self.insert(new_transaction)
    }

    async fn update(&self, transaction: Transaction) -> Result<Transaction> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|t| t.id == transaction.id)
            .ok_or_else(|| Error::not_found("Transaction", &transaction.id))?;
        *row = Transaction {
            updated_at: Utc::now(),
            ..transaction
        };
        Ok(row.clone())
    }

    async fn delete(&self, transaction_id: &str) -> Result<usize> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|t| t.id != transaction_id);
        Ok(before - rows.len())
    }

    fn get_by_id(&self, transaction_id: &str) -> Result<Transaction> {
        self.find_by_id(transaction_id)?
            .ok_or_else(|| Error::not_found("Transaction", transaction_id))
    }

    fn find_by_id(&self, transaction_id: &str) -> Result<Option<Transaction>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == transaction_id)
            .cloned())
    }

    fn list(&self, user_id: &str, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let mut rows: Vec<Transaction> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.user_id == user_id && filter.matches(t))
            .cloned()
            .collect();
        rows.sort_by_key(|t| t.event_date);
        Ok(rows)
    }

    fn list_by_wallet(&self, wallet_id: &str) -> Result<Vec<Transaction>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.shared_wallet_id.as_deref() == Some(wallet_id))
            .cloned()
            .collect())
    }
}

// =========================================================================
// Budgets
// =========================================================================

#[derive(Clone, Default)]
pub struct InMemoryBudgetRepository {
    rows: Arc<Mutex<Vec<Budget>>>,
    /// Number of upcoming versioned writes to reject with a conflict.
    conflicts_to_inject: Arc<Mutex<usize>>,
}

impl InMemoryBudgetRepository {
    pub fn inject_conflicts(&self, count: usize) {
        *self.conflicts_to_inject.lock().unwrap() = count;
    }

    fn take_injected_conflict(&self) -> bool {
        let mut remaining = self.conflicts_to_inject.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return true;
        }
        false
    }
}

#[async_trait]
impl BudgetRepositoryTrait for InMemoryBudgetRepository {
    async fn create(&self, new_budget: NewBudget) -> Result<Budget> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|b| {
            b.user_id == new_budget.user_id
                && b.month == new_budget.month
                && b.category == new_budget.category
        }) {
            return Err(ValidationError::Duplicate("budget scope".into()).into());
        }
        let now = Utc::now();
        let alert_threshold = new_budget.threshold_or_default();
        let budget = Budget {
            id: new_budget.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            user_id: new_budget.user_id,
            month: new_budget.month,
            category: new_budget.category,
            amount: new_budget.amount,
            used_amount: Decimal::ZERO,
            alert_threshold,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        rows.push(budget.clone());
        Ok(budget)
    }

    async fn update(&self, budget: Budget) -> Result<Budget> {
        if self.take_injected_conflict() {
            return Err(conflict("Budget", &budget.id));
        }
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|b| b.id == budget.id)
            .ok_or_else(|| Error::not_found("Budget", &budget.id))?;
        if row.version != budget.version {
            return Err(conflict("Budget", &budget.id));
        }
        row.amount = budget.amount;
        row.alert_threshold = budget.alert_threshold;
        row.version += 1;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn update_used_amount(
        &self,
        budget_id: &str,
        expected_version: i64,
        used_amount: Decimal,
    ) -> Result<Budget> {
        if self.take_injected_conflict() {
            return Err(conflict("Budget", budget_id));
        }
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|b| b.id == budget_id)
            .ok_or_else(|| Error::not_found("Budget", budget_id))?;
        if row.version != expected_version {
            return Err(conflict("Budget", budget_id));
        }
        row.used_amount = used_amount;
        row.version += 1;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete(&self, budget_id: &str) -> Result<usize> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|b| b.id != budget_id);
        Ok(before - rows.len())
    }

    fn get_by_id(&self, budget_id: &str) -> Result<Budget> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.id == budget_id)
            .cloned()
            .ok_or_else(|| Error::not_found("Budget", budget_id))
    }

    fn find_for_scope(
        &self,
        user_id: &str,
        month: &str,
        category: Option<&str>,
    ) -> Result<Option<Budget>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.user_id == user_id && b.month == month && b.category.as_deref() == category)
            .cloned())
    }

    fn list_by_user(&self, user_id: &str, month: Option<&str>) -> Result<Vec<Budget>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.user_id == user_id && month.map_or(true, |m| b.month == m))
            .cloned()
            .collect())
    }
}

// =========================================================================
// Recurring jobs
// =========================================================================

#[derive(Clone)]
pub struct InMemoryRecurringJobRepository {
    rows: Arc<Mutex<Vec<RecurringJob>>>,
    transactions: InMemoryTransactionRepository,
    fail_record_run_for: Arc<Mutex<Vec<String>>>,
}

impl InMemoryRecurringJobRepository {
    pub fn new(transactions: InMemoryTransactionRepository) -> Self {
        Self {
            rows: Arc::new(Mutex::new(Vec::new())),
            transactions,
            fail_record_run_for: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Makes `record_run` fail for one job, as a store error would.
    pub fn fail_record_run_for(&self, job_id: &str) {
        self.fail_record_run_for
            .lock()
            .unwrap()
            .push(job_id.to_string());
    }

    fn modify<F>(&self, job_id: &str, f: F) -> Result<RecurringJob>
    where
        F: FnOnce(&mut RecurringJob),
    {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|j| j.id == job_id)
            .ok_or_else(|| Error::not_found("Recurring job", job_id))?;
        f(row);
        row.updated_at = Utc::now();
        Ok(row.clone())
    }
}

#[async_trait]
impl RecurringJobRepositoryTrait for InMemoryRecurringJobRepository {
    async fn create(&self, new_job: NewRecurringJob) -> Result<RecurringJob> {
        let now = Utc::now();
        let job = RecurringJob {
            id: new_job.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            user_id: new_job.user_id,
            template_transaction_id: new_job.template_transaction_id,
            frequency: new_job.frequency,
            next_run_at: new_job.first_execution_at.unwrap_or(now),
            last_run_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(job.clone());
        Ok(job)
    }

    async fn update(&self, job: RecurringJob) -> Result<RecurringJob> {
        self.modify(&job.id.clone(), |row| {
            row.frequency = job.frequency;
            row.next_run_at = job.next_run_at;
            row.is_active = job.is_active;
        })
    }

    async fn deactivate(&self, job_id: &str) -> Result<RecurringJob> {
        self.modify(job_id, |row| row.is_active = false)
    }

    async fn deactivate_by_template(&self, template_transaction_id: &str) -> Result<usize> {
        let mut rows = self.rows.lock().unwrap();
        let mut count = 0;
        for row in rows
            .iter_mut()
            .filter(|j| j.template_transaction_id == template_transaction_id && j.is_active)
        {
            row.is_active = false;
            count += 1;
        }
        Ok(count)
    }

    async fn record_run(
        &self,
        job_id: &str,
        expected_next_run_at: DateTime<Utc>,
        materialized: NewTransaction,
        ran_at: DateTime<Utc>,
        next_run_at: DateTime<Utc>,
    ) -> Result<Transaction> {
        if self
            .fail_record_run_for
            .lock()
            .unwrap()
            .iter()
            .any(|id| id == job_id)
        {
            return Err(Error::Unexpected("Intentional record_run failure".into()));
        }
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|j| j.id == job_id)
            .ok_or_else(|| Error::not_found("Recurring job", job_id))?;
        if !row.is_active || row.next_run_at != expected_next_run_at {
            return Err(conflict("Recurring job", job_id));
        }
        let transaction = self.transactions.insert(materialized)?;
        row.last_run_at = Some(ran_at);
        row.next_run_at = next_run_at;
        row.updated_at = Utc::now();
        Ok(transaction)
    }

    async fn delete(&self, job_id: &str) -> Result<usize> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|j| j.id != job_id);
        Ok(before - rows.len())
    }

    fn get_by_id(&self, job_id: &str) -> Result<RecurringJob> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|j| j.id == job_id)
            .cloned()
            .ok_or_else(|| Error::not_found("Recurring job", job_id))
    }

    fn list_by_user(&self, user_id: &str) -> Result<Vec<RecurringJob>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|j| j.user_id == user_id)
            .cloned()
            .collect())
    }

    fn find_by_template(
        &self,
        user_id: &str,
        template_transaction_id: &str,
    ) -> Result<Option<RecurringJob>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|j| j.user_id == user_id && j.template_transaction_id == template_transaction_id)
            .cloned())
    }

    fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<RecurringJob>> {
        let mut due: Vec<RecurringJob> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|j| j.is_due(now))
            .cloned()
            .collect();
        due.sort_by(|a, b| a.next_run_at.cmp(&b.next_run_at).then_with(|| a.id.cmp(&b.id)));
        Ok(due)
    }
}

// =========================================================================
// Shared wallets
// =========================================================================

#[derive(Clone)]
pub struct InMemorySharedWalletRepository {
    wallets: Arc<Mutex<Vec<SharedWallet>>>,
    members: Arc<Mutex<Vec<SharedWalletMember>>>,
    transactions: InMemoryTransactionRepository,
}

impl InMemorySharedWalletRepository {
    pub fn new(transactions: InMemoryTransactionRepository) -> Self {
        Self {
            wallets: Arc::new(Mutex::new(Vec::new())),
            members: Arc::new(Mutex::new(Vec::new())),
            transactions,
        }
    }

    fn insert_member(&self, new_member: NewWalletMember) -> SharedWalletMember {
        let now = Utc::now();
        let member = SharedWalletMember {
            id: Uuid::new_v4().to_string(),
            wallet_id: new_member.wallet_id,
            member_id: new_member.member_id,
            share_ratio: new_member.share_ratio,
            running_balance: Decimal::ZERO,
            is_admin: new_member.is_admin,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        self.members.lock().unwrap().push(member.clone());
        member
    }
}

#[async_trait]
impl SharedWalletRepositoryTrait for InMemorySharedWalletRepository {
    async fn create_wallet(
        &self,
        new_wallet: NewSharedWallet,
    ) -> Result<(SharedWallet, SharedWalletMember)> {
        let now = Utc::now();
        let wallet = SharedWallet {
            id: new_wallet
                .id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: new_wallet.name.clone(),
            owner_id: new_wallet.owner_id.clone(),
            created_at: now,
            updated_at: now,
        };
        self.wallets.lock().unwrap().push(wallet.clone());
        let owner = self.insert_member(new_wallet.owner_membership(&wallet.id));
        Ok((wallet, owner))
    }

    async fn rename_wallet(&self, wallet_id: &str, name: &str) -> Result<SharedWallet> {
        let mut wallets = self.wallets.lock().unwrap();
        let wallet = wallets
            .iter_mut()
            .find(|w| w.id == wallet_id)
            .ok_or_else(|| Error::not_found("Shared wallet", wallet_id))?;
        wallet.name = name.to_string();
        wallet.updated_at = Utc::now();
        Ok(wallet.clone())
    }

    async fn delete_wallet(&self, wallet_id: &str) -> Result<usize> {
        let removed = {
            let mut wallets = self.wallets.lock().unwrap();
            let before = wallets.len();
            wallets.retain(|w| w.id != wallet_id);
            before - wallets.len()
        };
        self.members
            .lock()
            .unwrap()
            .retain(|m| m.wallet_id != wallet_id);
        self.transactions.detach_wallet(wallet_id);
        Ok(removed)
    }

    fn get_wallet(&self, wallet_id: &str) -> Result<SharedWallet> {
        self.wallets
            .lock()
            .unwrap()
            .iter()
            .find(|w| w.id == wallet_id)
            .cloned()
            .ok_or_else(|| Error::not_found("Shared wallet", wallet_id))
    }

    fn list_wallets_by_owner(&self, owner_id: &str) -> Result<Vec<SharedWallet>> {
        Ok(self
            .wallets
            .lock()
            .unwrap()
            .iter()
            .filter(|w| w.owner_id == owner_id)
            .cloned()
            .collect())
    }

    fn exists_by_owner_and_name(&self, owner_id: &str, name: &str) -> Result<bool> {
        Ok(self
            .wallets
            .lock()
            .unwrap()
            .iter()
            .any(|w| w.owner_id == owner_id && w.name.to_lowercase() == name.to_lowercase()))
    }

    async fn add_member(&self, new_member: NewWalletMember) -> Result<SharedWalletMember> {
        Ok(self.insert_member(new_member))
    }

    async fn update_member(&self, member: SharedWalletMember) -> Result<SharedWalletMember> {
        let mut members = self.members.lock().unwrap();
        let row = members
            .iter_mut()
            .find(|m| m.wallet_id == member.wallet_id && m.member_id == member.member_id)
            .ok_or_else(|| Error::not_found("Wallet member", &member.member_id))?;
        if row.version != member.version {
            return Err(conflict("Wallet member", &member.member_id));
        }
        row.share_ratio = member.share_ratio;
        row.is_admin = member.is_admin;
        row.version += 1;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn remove_member(&self, wallet_id: &str, member_id: &str) -> Result<usize> {
        let mut members = self.members.lock().unwrap();
        let before = members.len();
        members.retain(|m| !(m.wallet_id == wallet_id && m.member_id == member_id));
        Ok(before - members.len())
    }

    fn list_members(&self, wallet_id: &str) -> Result<Vec<SharedWalletMember>> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.wallet_id == wallet_id)
            .cloned()
            .collect())
    }

    fn find_member(
        &self,
        wallet_id: &str,
        member_id: &str,
    ) -> Result<Option<SharedWalletMember>> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.wallet_id == wallet_id && m.member_id == member_id)
            .cloned())
    }

    fn list_memberships(&self, member_id: &str) -> Result<Vec<SharedWalletMember>> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.member_id == member_id)
            .cloned()
            .collect())
    }

    async fn update_balances(
        &self,
        wallet_id: &str,
        balances: Vec<MemberBalanceUpdate>,
    ) -> Result<Vec<SharedWalletMember>> {
        let mut members = self.members.lock().unwrap();
        for update in &balances {
            let row = members
                .iter()
                .find(|m| m.wallet_id == wallet_id && m.member_id == update.member_id)
                .ok_or_else(|| Error::not_found("Wallet member", &update.member_id))?;
            if row.version != update.expected_version {
                return Err(conflict("Wallet member", &update.member_id));
            }
        }
        let now = Utc::now();
        let mut written = Vec::with_capacity(balances.len());
        for update in balances {
            if let Some(row) = members
                .iter_mut()
                .find(|m| m.wallet_id == wallet_id && m.member_id == update.member_id)
            {
                row.running_balance = update.running_balance;
                row.version += 1;
                row.updated_at = now;
                written.push(row.clone());
            }
        }
        Ok(written)
    }
}

// =========================================================================
// Notifications
// =========================================================================

#[derive(Clone, Default)]
pub struct InMemoryNotificationRepository {
    rows: Arc<Mutex<Vec<Notification>>>,
}

#[async_trait]
impl NotificationRepositoryTrait for InMemoryNotificationRepository {
    async fn create(&self, new_notification: NewNotification) -> Result<Notification> {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            user_id: new_notification.user_id,
            notification_type: new_notification.notification_type,
            title: new_notification.title,
            message: new_notification.message,
            metadata: new_notification.metadata,
            is_read: false,
            created_at: Utc::now(),
        };
        self.rows.lock().unwrap().push(notification.clone());
        Ok(notification)
    }

    fn list_by_user(&self, user_id: &str, unread_only: bool) -> Result<Vec<Notification>> {
        let mut rows: Vec<Notification> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.is_read))
            .cloned()
            .collect();
        rows.reverse();
        Ok(rows)
    }

    async fn mark_read(&self, notification_id: &str) -> Result<usize> {
        let mut count = 0;
        for row in self.rows.lock().unwrap().iter_mut() {
            if row.id == notification_id {
                row.is_read = true;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn mark_all_read(&self, user_id: &str) -> Result<usize> {
        let mut count = 0;
        for row in self.rows.lock().unwrap().iter_mut() {
            if row.user_id == user_id && !row.is_read {
                row.is_read = true;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn delete(&self, notification_id: &str) -> Result<usize> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|n| n.id != notification_id);
        Ok(before - rows.len())
    }
}

// =========================================================================
// Wired graph
// =========================================================================

/// Every service of the core wired over in-memory repositories.
pub struct TestHarness {
    pub transactions: InMemoryTransactionRepository,
    pub budgets: InMemoryBudgetRepository,
    pub jobs: InMemoryRecurringJobRepository,
    pub wallets: InMemorySharedWalletRepository,
    pub sink: MockNotificationSink,
    pub reconciler: Arc<BudgetReconciler>,
    pub settlement: Arc<SettlementEngine>,
    pub transaction_service: TransactionService,
    pub budget_service: BudgetService,
    pub wallet_service: SharedWalletService,
    pub job_service: RecurringJobService,
    pub runner: RecurringJobRunner,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_runner_config(RunnerConfig::default())
    }

    pub fn with_runner_config(config: RunnerConfig) -> Self {
        let transactions = InMemoryTransactionRepository::default();
        let budgets = InMemoryBudgetRepository::default();
        let jobs = InMemoryRecurringJobRepository::new(transactions.clone());
        let wallets = InMemorySharedWalletRepository::new(transactions.clone());
        let sink = MockNotificationSink::new();
        let locks = Arc::new(KeyedLocks::new());

        let transaction_repo: Arc<dyn TransactionRepositoryTrait> = Arc::new(transactions.clone());
        let budget_repo: Arc<dyn BudgetRepositoryTrait> = Arc::new(budgets.clone());
        let job_repo: Arc<dyn RecurringJobRepositoryTrait> = Arc::new(jobs.clone());
        let wallet_repo: Arc<dyn SharedWalletRepositoryTrait> = Arc::new(wallets.clone());

        let reconciler = Arc::new(BudgetReconciler::new(
            budget_repo.clone(),
            transaction_repo.clone(),
            Arc::new(sink.clone()),
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

        Self {
            transaction_service: TransactionService::new(
                transaction_repo.clone(),
                wallet_repo.clone(),
                job_repo.clone(),
                dispatcher.clone(),
            ),
            budget_service: BudgetService::new(budget_repo, reconciler.clone()),
            wallet_service: SharedWalletService::new(
                wallet_repo,
                settlement.clone(),
                Arc::new(sink.clone()),
                locks,
            ),
            job_service: RecurringJobService::new(job_repo.clone(), transaction_repo.clone()),
            runner: RecurringJobRunner::new(
                job_repo,
                transaction_repo,
                dispatcher,
                Arc::new(sink.clone()),
                config,
            ),
            transactions,
            budgets,
            jobs,
            wallets,
            sink,
            reconciler,
            settlement,
        }
    }
}
