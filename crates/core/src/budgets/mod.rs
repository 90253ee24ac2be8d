//! Budgets module - monthly spending limits and their reconciliation.

mod budget_reconciler;
mod budgets_model;
mod budgets_service;
mod budgets_traits;


pub use budget_reconciler::BudgetReconciler;
pub use budgets_model::{Budget, BudgetProgress, BudgetUpdate, NewBudget};
pub use budgets_service::BudgetService;
pub use budgets_traits::{BudgetRepositoryTrait, BudgetServiceTrait};
