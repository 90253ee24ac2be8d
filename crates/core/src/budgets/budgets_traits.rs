//! Budget repository and service traits.

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::budgets_model::{Budget, BudgetProgress, BudgetUpdate, NewBudget};
use crate::errors::Result;

/// Persistence contract for budgets.
///
/// Writes that take a `Budget` or an `expected_version` are versioned: they
/// fail with `Error::ConcurrencyConflict` when the stored version differs,
/// and bump the version on success.
#[async_trait]
pub trait BudgetRepositoryTrait: Send + Sync {
    /// Inserts a budget with `used_amount` 0 and version 1. Fails with a
    /// duplicate error when the (user, month, category) scope is taken.
    async fn create(&self, new_budget: NewBudget) -> Result<Budget>;

    /// Persists amount and threshold of `budget`.
    async fn update(&self, budget: Budget) -> Result<Budget>;

    async fn update_used_amount(
        &self,
        budget_id: &str,
        expected_version: i64,
        used_amount: Decimal,
    ) -> Result<Budget>;

    async fn delete(&self, budget_id: &str) -> Result<usize>;

    fn get_by_id(&self, budget_id: &str) -> Result<Budget>;

    /// Exact scope lookup; `category == None` selects the whole-month budget.
    fn find_for_scope(
        &self,
        user_id: &str,
        month: &str,
        category: Option<&str>,
    ) -> Result<Option<Budget>>;

    fn list_by_user(&self, user_id: &str, month: Option<&str>) -> Result<Vec<Budget>>;
}

#[async_trait]
pub trait BudgetServiceTrait: Send + Sync {
    /// Creates a budget and immediately reconciles it against existing
    /// transactions.
    async fn create_budget(&self, new_budget: NewBudget) -> Result<Budget>;

    async fn update_budget(&self, budget_id: &str, update: BudgetUpdate) -> Result<Budget>;

    async fn delete_budget(&self, budget_id: &str) -> Result<()>;

    fn get_budget(&self, budget_id: &str) -> Result<Budget>;

    fn list_budgets(&self, user_id: &str, month: Option<&str>) -> Result<Vec<Budget>>;

    fn get_progress(&self, budget_id: &str) -> Result<BudgetProgress>;

    /// Recomputes `used_amount` from the transaction store.
    async fn reconcile_budget(&self, budget_id: &str) -> Result<Budget>;
}
