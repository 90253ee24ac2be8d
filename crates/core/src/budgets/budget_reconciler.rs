//! Keeps each budget's cached `used_amount` equal to the sum of the
//! expenses in its scope.
//!
//! Every reconcile recomputes from the transaction store rather than
//! applying deltas, so a missed or repeated event heals on the next pass.

use std::sync::Arc;

use log::{debug, warn};
use rust_decimal::Decimal;

use super::budgets_model::Budget;
use super::budgets_traits::BudgetRepositoryTrait;
use crate::errors::Result;
use crate::money::round_ledger;
use crate::notifications::{notify_best_effort, NotificationSink, NotificationType};
use crate::transactions::{ChangeKind, Transaction, TransactionFilter, TransactionRepositoryTrait};
use crate::utils::keyed_lock::{budget_key, KeyedLocks};
use crate::utils::time_utils::month_bounds;

pub struct BudgetReconciler {
    budget_repository: Arc<dyn BudgetRepositoryTrait>,
    transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    notification_sink: Arc<dyn NotificationSink>,
    locks: Arc<KeyedLocks>,
}

impl BudgetReconciler {
    pub fn new(
        budget_repository: Arc<dyn BudgetRepositoryTrait>,
        transaction_repository: Arc<dyn TransactionRepositoryTrait>,
        notification_sink: Arc<dyn NotificationSink>,
        locks: Arc<KeyedLocks>,
    ) -> Self {
        Self {
            budget_repository,
            transaction_repository,
            notification_sink,
            locks,
        }
    }

    /// Reconciles the budgets covering `transaction`'s scope.
    ///
    /// The category budget and the whole-month budget are both refreshed
    /// when both exist. Returns the reconciled budgets, empty when none
    /// covers the scope.
    pub async fn on_transaction_changed(
        &self,
        transaction: &Transaction,
        change: ChangeKind,
    ) -> Result<Vec<Budget>> {
        let month = transaction.month();
        let budgets =
            self.resolve_budgets(&transaction.user_id, &month, &transaction.category)?;
        if budgets.is_empty() {
            debug!(
                "No budget covers {} / {} / {} ({:?} {})",
                transaction.user_id, month, transaction.category, change, transaction.id
            );
            return Ok(Vec::new());
        }

        let mut reconciled = Vec::with_capacity(budgets.len());
        for budget in budgets {
            reconciled.push(self.reconcile_budget(&budget.id).await?);
        }
        Ok(reconciled)
    }

    /// The category budget first, then the whole-month budget.
    pub fn resolve_budgets(
        &self,
        user_id: &str,
        month: &str,
        category: &str,
    ) -> Result<Vec<Budget>> {
        let mut budgets = Vec::with_capacity(2);
        if let Some(budget) =
            self.budget_repository
                .find_for_scope(user_id, month, Some(category))?
        {
            budgets.push(budget);
        }
        if let Some(budget) = self.budget_repository.find_for_scope(user_id, month, None)? {
            budgets.push(budget);
        }
        Ok(budgets)
    }

    /// Recomputes one budget under its lock, retrying once on a version
    /// conflict with fresh reads.
    pub async fn reconcile_budget(&self, budget_id: &str) -> Result<Budget> {
        let _guard = self.locks.lock(&budget_key(budget_id)).await;
        match self.try_reconcile(budget_id).await {
            Err(e) if e.is_concurrency_conflict() => {
                warn!("Budget {} changed during reconcile, retrying: {}", budget_id, e);
                self.try_reconcile(budget_id).await
            }
            result => result,
        }
    }

    async fn try_reconcile(&self, budget_id: &str) -> Result<Budget> {
        let budget = self.budget_repository.get_by_id(budget_id)?;
        let used_amount = self.compute_used_amount(&budget)?;
        if used_amount == budget.used_amount {
            return Ok(budget);
        }

        let updated = self
            .budget_repository
            .update_used_amount(&budget.id, budget.version, used_amount)
            .await?;
        debug!(
            "Budget {} used amount {} -> {}",
            updated.id, budget.used_amount, updated.used_amount
        );
        self.notify_threshold_crossing(&budget, &updated).await;
        Ok(updated)
    }

    /// Sum of expense amounts in the budget's month and category.
    pub fn compute_used_amount(&self, budget: &Budget) -> Result<Decimal> {
        let (first, last) = month_bounds(&budget.month)?;
        let filter = TransactionFilter::expenses_between(first, last, budget.category.as_deref());
        let total = self
            .transaction_repository
            .list(&budget.user_id, &filter)?
            .iter()
            .map(|t| t.amount)
            .sum::<Decimal>();
        Ok(round_ledger(total))
    }

    /// Alerts when `after` reached a level `before` was below.
    pub(crate) async fn notify_threshold_crossing(&self, before: &Budget, after: &Budget) {
        if after.is_threshold_reached() && !before.is_threshold_reached() {
            let percent = after.percentage_used() * Decimal::ONE_HUNDRED;
            notify_best_effort(
                self.notification_sink.as_ref(),
                &after.user_id,
                NotificationType::BudgetThreshold,
                "Budget alert",
                &format!(
                    "You have used {}% of your budget for {}.",
                    percent.normalize(),
                    after.scope_label()
                ),
            )
            .await;
        }
        if after.is_exceeded() && !before.is_exceeded() {
            notify_best_effort(
                self.notification_sink.as_ref(),
                &after.user_id,
                NotificationType::BudgetExceeded,
                "Budget exceeded",
                &format!(
                    "Spending of {} exceeds your budget of {} for {}.",
                    after.used_amount,
                    after.amount,
                    after.scope_label()
                ),
            )
            .await;
        }
    }
}
