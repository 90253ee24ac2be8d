//! Database models for budgets.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use fintrack_core::budgets::{Budget, NewBudget};

use crate::errors::StorageError;
use crate::utils::{format_instant, parse_decimal, parse_timestamp};

/// Whole-month budgets store an empty category so that the
/// `(user_id, month, category)` unique key also covers them.
pub const WHOLE_MONTH_CATEGORY: &str = "";

#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::budgets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BudgetDB {
    pub id: String,
    pub user_id: String,
    pub month: String,
    pub category: String,
    pub amount: String,
    pub used_amount: String,
    pub alert_threshold: String,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl BudgetDB {
    pub fn from_new(new_budget: NewBudget, now: DateTime<Utc>) -> Self {
        let stamp = format_instant(now);
        let alert_threshold = new_budget.threshold_or_default();
        Self {
            id: new_budget.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            user_id: new_budget.user_id,
            month: new_budget.month,
            category: category_column(new_budget.category.as_deref()),
            amount: new_budget.amount.to_string(),
            used_amount: Decimal::ZERO.to_string(),
            alert_threshold: alert_threshold.to_string(),
            version: 1,
            created_at: stamp.clone(),
            updated_at: stamp,
        }
    }
}

pub fn category_column(category: Option<&str>) -> String {
    category.unwrap_or(WHOLE_MONTH_CATEGORY).to_string()
}

impl TryFrom<BudgetDB> for Budget {
    type Error = StorageError;

    fn try_from(db: BudgetDB) -> Result<Self, Self::Error> {
        Ok(Self {
            amount: parse_decimal(&db.amount, "budgets.amount")?,
            used_amount: parse_decimal(&db.used_amount, "budgets.used_amount")?,
            alert_threshold: parse_decimal(&db.alert_threshold, "budgets.alert_threshold")?,
            created_at: parse_timestamp(&db.created_at, "budgets.created_at")?,
            updated_at: parse_timestamp(&db.updated_at, "budgets.updated_at")?,
            category: Some(db.category).filter(|c| c != WHOLE_MONTH_CATEGORY),
            id: db.id,
            user_id: db.user_id,
            month: db.month,
            version: db.version,
        })
    }
}
