//! Budget domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ALERT_THRESHOLD, MAX_CATEGORY_LEN};
use crate::errors::{Error, Result};
use crate::money::{ratio_of, round_ledger, round_ratio};
use crate::utils::time_utils::parse_month;

/// A spending limit for one month, either for one category or for the
/// whole month (`category == None`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: String,
    pub user_id: String,
    pub month: String,
    pub category: Option<String>,
    pub amount: Decimal,
    pub used_amount: Decimal,
    pub alert_threshold: Decimal,
    /// Incremented on every write; guards versioned updates.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    pub fn is_whole_month(&self) -> bool {
        self.category.is_none()
    }

    /// `amount - used_amount`, floored at zero once the budget is overspent.
    pub fn remaining_amount(&self) -> Decimal {
        round_ledger((self.amount - self.used_amount).max(Decimal::ZERO))
    }

    /// `used_amount / amount` at ratio scale, 0 for a zero budget. For
    /// display only; threshold checks use the exact amounts.
    pub fn percentage_used(&self) -> Decimal {
        ratio_of(self.used_amount, self.amount)
    }

    /// True once usage reached the alert threshold.
    ///
    /// A zero budget has no meaningful percentage; any spending reaches it.
    pub fn is_threshold_reached(&self) -> bool {
        if self.amount.is_zero() {
            return self.used_amount > Decimal::ZERO;
        }
        self.used_amount >= self.amount * self.alert_threshold
    }

    pub fn is_exceeded(&self) -> bool {
        self.used_amount > self.amount
    }

    pub fn progress(&self) -> BudgetProgress {
        BudgetProgress {
            budget_id: self.id.clone(),
            month: self.month.clone(),
            category: self.category.clone(),
            amount: self.amount,
            used_amount: self.used_amount,
            remaining_amount: self.remaining_amount(),
            percentage_used: self.percentage_used(),
            alert_threshold: self.alert_threshold,
            is_threshold_reached: self.is_threshold_reached(),
            is_exceeded: self.is_exceeded(),
        }
    }

    pub fn scope_label(&self) -> String {
        match &self.category {
            Some(category) => format!("{} ({})", category, self.month),
            None => format!("all categories ({})", self.month),
        }
    }
}

/// Input model for creating a budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBudget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    pub month: String,
    pub category: Option<String>,
    pub amount: Decimal,
    pub alert_threshold: Option<Decimal>,
}

impl NewBudget {
    /// Trims the category (blank means whole month), rounds amounts and
    /// fills the default threshold.
    pub fn normalized(mut self) -> Self {
        self.month = self.month.trim().to_string();
        self.category = self
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        self.amount = round_ledger(self.amount);
        self.alert_threshold = Some(round_ratio(
            self.alert_threshold.unwrap_or(DEFAULT_ALERT_THRESHOLD),
        ));
        self
    }

    pub fn threshold_or_default(&self) -> Decimal {
        self.alert_threshold.unwrap_or(DEFAULT_ALERT_THRESHOLD)
    }

    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(Error::invalid_input("Budget user cannot be empty"));
        }
        parse_month(&self.month)?;
        if let Some(category) = &self.category {
            if category.chars().count() > MAX_CATEGORY_LEN {
                return Err(Error::invalid_input(format!(
                    "Category exceeds {} characters",
                    MAX_CATEGORY_LEN
                )));
            }
        }
        validate_amount(self.amount)?;
        validate_threshold(self.threshold_or_default())
    }
}

/// Partial update of a budget's limit or threshold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetUpdate {
    pub amount: Option<Decimal>,
    pub alert_threshold: Option<Decimal>,
}

impl BudgetUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(amount) = self.amount {
            validate_amount(amount)?;
        }
        if let Some(threshold) = self.alert_threshold {
            validate_threshold(threshold)?;
        }
        Ok(())
    }

    pub fn apply_to(&self, budget: &Budget) -> Budget {
        let mut updated = budget.clone();
        if let Some(amount) = self.amount {
            updated.amount = round_ledger(amount);
        }
        if let Some(threshold) = self.alert_threshold {
            updated.alert_threshold = round_ratio(threshold);
        }
        updated
    }
}

/// Read model derived from a budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetProgress {
    pub budget_id: String,
    pub month: String,
    pub category: Option<String>,
    pub amount: Decimal,
    pub used_amount: Decimal,
    pub remaining_amount: Decimal,
    pub percentage_used: Decimal,
    pub alert_threshold: Decimal,
    pub is_threshold_reached: bool,
    pub is_exceeded: bool,
}

fn validate_amount(amount: Decimal) -> Result<()> {
    if amount < Decimal::ZERO {
        return Err(Error::invalid_input("Budget amount cannot be negative"));
    }
    Ok(())
}

fn validate_threshold(threshold: Decimal) -> Result<()> {
    if threshold < Decimal::ZERO || threshold > Decimal::ONE {
        return Err(Error::invalid_input(format!(
            "Alert threshold {} must be between 0 and 1",
            threshold
        )));
    }
    Ok(())
}
