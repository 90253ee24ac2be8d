use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};

use super::budget_reconciler::BudgetReconciler;
use super::budgets_model::{Budget, BudgetProgress, BudgetUpdate, NewBudget};
use super::budgets_traits::{BudgetRepositoryTrait, BudgetServiceTrait};
use crate::errors::{Error, Result, ValidationError};
use crate::utils::time_utils::parse_month;

/// Service for managing budgets.
pub struct BudgetService {
    repository: Arc<dyn BudgetRepositoryTrait>,
    reconciler: Arc<BudgetReconciler>,
}

impl BudgetService {
    pub fn new(repository: Arc<dyn BudgetRepositoryTrait>, reconciler: Arc<BudgetReconciler>) -> Self {
        Self {
            repository,
            reconciler,
        }
    }

    async fn try_update(&self, budget_id: &str, update: &BudgetUpdate) -> Result<(Budget, Budget)> {
        let before = self.repository.get_by_id(budget_id)?;
        let after = self.repository.update(update.apply_to(&before)).await?;
        Ok((before, after))
    }
}

#[async_trait]
impl BudgetServiceTrait for BudgetService {
    async fn create_budget(&self, new_budget: NewBudget) -> Result<Budget> {
        let new_budget = new_budget.normalized();
        new_budget.validate()?;

        if self
            .repository
            .find_for_scope(
                &new_budget.user_id,
                &new_budget.month,
                new_budget.category.as_deref(),
            )?
            .is_some()
        {
            return Err(ValidationError::Duplicate(format!(
                "A budget for {} / {} already exists",
                new_budget.month,
                new_budget.category.as_deref().unwrap_or("all categories")
            ))
            .into());
        }

        let created = self.repository.create(new_budget).await?;
        debug!("Created budget {} ({})", created.id, created.scope_label());
        self.reconciler.reconcile_budget(&created.id).await
    }

    async fn update_budget(&self, budget_id: &str, update: BudgetUpdate) -> Result<Budget> {
        update.validate()?;
        let (before, after) = match self.try_update(budget_id, &update).await {
            Err(e) if e.is_concurrency_conflict() => {
                warn!("Budget {} changed during update, retrying: {}", budget_id, e);
                self.try_update(budget_id, &update).await?
            }
            result => result?,
        };
        // A lower limit or threshold can cross the alert level without any
        // new spending.
        self.reconciler.notify_threshold_crossing(&before, &after).await;
        self.reconciler.reconcile_budget(budget_id).await
    }

    async fn delete_budget(&self, budget_id: &str) -> Result<()> {
        if self.repository.delete(budget_id).await? == 0 {
            return Err(Error::not_found("Budget", budget_id));
        }
        Ok(())
    }

    fn get_budget(&self, budget_id: &str) -> Result<Budget> {
        self.repository.get_by_id(budget_id)
    }

    fn list_budgets(&self, user_id: &str, month: Option<&str>) -> Result<Vec<Budget>> {
        if let Some(month) = month {
            parse_month(month)?;
        }
        self.repository.list_by_user(user_id, month)
    }

    fn get_progress(&self, budget_id: &str) -> Result<BudgetProgress> {
        Ok(self.repository.get_by_id(budget_id)?.progress())
    }

    async fn reconcile_budget(&self, budget_id: &str) -> Result<Budget> {
        self.reconciler.reconcile_budget(budget_id).await
    }
}
