use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;
use rust_decimal::Decimal;

use fintrack_core::budgets::{Budget, BudgetRepositoryTrait, NewBudget};
use fintrack_core::errors::{Error, Result};

use super::model::{category_column, BudgetDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{duplicate_or_storage, StorageError};
use crate::schema::budgets;
use crate::utils::format_instant;

pub struct BudgetRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl BudgetRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

fn scope_name(category: &str) -> &str {
    if category.is_empty() {
        "(whole month)"
    } else {
        category
    }
}

/// Explains why a versioned update touched no row.
fn missed_update(conn: &mut SqliteConnection, budget_id: &str) -> Error {
    let exists = budgets::table
        .find(budget_id)
        .select(budgets::id)
        .first::<String>(conn)
        .optional();
    match exists {
        Ok(Some(_)) => Error::ConcurrencyConflict(format!(
            "Budget '{}' was modified concurrently",
            budget_id
        )),
        Ok(None) => Error::not_found("Budget", budget_id),
        Err(e) => StorageError::from(e).into(),
    }
}

#[async_trait]
impl BudgetRepositoryTrait for BudgetRepository {
    async fn create(&self, new_budget: NewBudget) -> Result<Budget> {
        let row = BudgetDB::from_new(new_budget, Utc::now());
        self.writer
            .exec(move |conn| -> Result<Budget> {
                let inserted = diesel::insert_into(budgets::table)
                    .values(&row)
                    .returning(BudgetDB::as_returning())
                    .get_result(conn)
                    .map_err(|e| {
                        duplicate_or_storage(e, || {
                            format!("budget for {} {}", row.month, scope_name(&row.category))
                        })
                    })?;
                Ok(Budget::try_from(inserted)?)
            })
            .await
    }

    async fn update(&self, budget: Budget) -> Result<Budget> {
        self.writer
            .exec(move |conn| -> Result<Budget> {
                let updated = diesel::update(
                    budgets::table
                        .filter(budgets::id.eq(&budget.id))
                        .filter(budgets::version.eq(budget.version)),
                )
                .set((
                    budgets::amount.eq(budget.amount.to_string()),
                    budgets::alert_threshold.eq(budget.alert_threshold.to_string()),
                    budgets::version.eq(budgets::version + 1),
                    budgets::updated_at.eq(format_instant(Utc::now())),
                ))
                .returning(BudgetDB::as_returning())
                .get_result(conn)
                .optional()
                .map_err(StorageError::from)?;
                match updated {
                    Some(row) => Ok(Budget::try_from(row)?),
                    None => Err(missed_update(conn, &budget.id)),
                }
            })
            .await
    }

    async fn update_used_amount(
        &self,
        budget_id: &str,
        expected_version: i64,
        used_amount: Decimal,
    ) -> Result<Budget> {
        let budget_id = budget_id.to_string();
        self.writer
            .exec(move |conn| -> Result<Budget> {
                let updated = diesel::update(
                    budgets::table
                        .filter(budgets::id.eq(&budget_id))
                        .filter(budgets::version.eq(expected_version)),
                )
                .set((
                    budgets::used_amount.eq(used_amount.to_string()),
                    budgets::version.eq(budgets::version + 1),
                    budgets::updated_at.eq(format_instant(Utc::now())),
                ))
                .returning(BudgetDB::as_returning())
                .get_result(conn)
                .optional()
                .map_err(StorageError::from)?;
                match updated {
                    Some(row) => Ok(Budget::try_from(row)?),
                    None => Err(missed_update(conn, &budget_id)),
                }
            })
            .await
    }

    async fn delete(&self, budget_id: &str) -> Result<usize> {
        let budget_id = budget_id.to_string();
        self.writer
            .exec(move |conn| -> Result<usize> {
                Ok(diesel::delete(budgets::table.find(budget_id))
                    .execute(conn)
                    .map_err(StorageError::from)?)
            })
            .await
    }

    fn get_by_id(&self, budget_id: &str) -> Result<Budget> {
        let mut conn = get_connection(&self.pool)?;
        let row = budgets::table
            .find(budget_id)
            .select(BudgetDB::as_select())
            .first::<BudgetDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .ok_or_else(|| Error::not_found("Budget", budget_id))?;
        Ok(Budget::try_from(row)?)
    }

    fn find_for_scope(
        &self,
        user_id: &str,
        month: &str,
        category: Option<&str>,
    ) -> Result<Option<Budget>> {
        let mut conn = get_connection(&self.pool)?;
        let row = budgets::table
            .filter(budgets::user_id.eq(user_id))
            .filter(budgets::month.eq(month))
            .filter(budgets::category.eq(category_column(category)))
            .select(BudgetDB::as_select())
            .first::<BudgetDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(Budget::try_from).transpose()?)
    }

    fn list_by_user(&self, user_id: &str, month: Option<&str>) -> Result<Vec<Budget>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = budgets::table
            .filter(budgets::user_id.eq(user_id))
            .into_boxed();
        if let Some(month) = month {
            query = query.filter(budgets::month.eq(month));
        }
        let rows = query
            .order((budgets::month.asc(), budgets::category.asc()))
            .select(BudgetDB::as_select())
            .load::<BudgetDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(|row| Budget::try_from(row).map_err(Error::from))
            .collect()
    }
}
