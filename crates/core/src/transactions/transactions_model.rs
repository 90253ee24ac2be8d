//! Transaction domain models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CURRENCY, MAX_ATTACHMENT_URL_LEN, MAX_CATEGORY_LEN, MAX_NOTE_LEN, MAX_TITLE_LEN,
};
use crate::errors::{Error, Result, ValidationError};
use crate::money::{round_ledger, Money};
use crate::utils::time_utils::month_key;

/// Direction of a transaction. The stored amount is always a magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "INCOME",
            TransactionType::Expense => "EXPENSE",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "INCOME" => Ok(TransactionType::Income),
            "EXPENSE" => Ok(TransactionType::Expense),
            other => Err(Error::invalid_input(format!(
                "Unknown transaction type '{}'",
                other
            ))),
        }
    }
}

/// What happened to a transaction, as seen by reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// Domain model representing a ledger transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    pub shared_wallet_id: Option<String>,
    pub title: String,
    pub amount: Decimal,
    pub currency: String,
    pub category: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub event_date: NaiveDate,
    pub note: Option<String>,
    pub attachment_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Positive for income, negative for expense.
    pub fn signed_amount(&self) -> Decimal {
        match self.transaction_type {
            TransactionType::Income => self.amount,
            TransactionType::Expense => -self.amount,
        }
    }

    pub fn money(&self) -> Money {
        Money::new(self.amount, self.currency.clone())
    }

    pub fn is_expense(&self) -> bool {
        self.transaction_type == TransactionType::Expense
    }

    /// The `YYYY-MM` month the transaction is booked in.
    pub fn month(&self) -> String {
        month_key(self.event_date)
    }

    /// The (user, month, category) triple budgets are resolved against.
    pub fn budget_scope(&self) -> (String, String, String) {
        (self.user_id.clone(), self.month(), self.category.clone())
    }

    pub fn validate(&self) -> Result<()> {
        validate_fields(
            &self.title,
            self.amount,
            &self.currency,
            &self.category,
            self.note.as_deref(),
            self.attachment_url.as_deref(),
        )
    }
}

/// Input model for creating a new transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    pub shared_wallet_id: Option<String>,
    pub title: String,
    pub amount: Decimal,
    pub currency: Option<String>,
    pub category: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub event_date: NaiveDate,
    pub note: Option<String>,
    pub attachment_url: Option<String>,
}

impl NewTransaction {
    /// Trims text fields, rounds the amount and fills the default currency.
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.category = self.category.trim().to_string();
        self.amount = round_ledger(self.amount);
        self.currency = Some(normalize_currency(self.currency.as_deref()));
        self.shared_wallet_id = self.shared_wallet_id.filter(|w| !w.trim().is_empty());
        self
    }

    pub fn currency_or_default(&self) -> String {
        normalize_currency(self.currency.as_deref())
    }

    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "userId".to_string(),
            )));
        }
        validate_fields(
            &self.title,
            self.amount,
            &self.currency_or_default(),
            &self.category,
            self.note.as_deref(),
            self.attachment_url.as_deref(),
        )
    }

    /// Builds a copy of `template` for `user_id` dated `event_date`.
    pub fn from_template(template: &Transaction, user_id: &str, event_date: NaiveDate) -> Self {
        Self {
            id: None,
            user_id: user_id.to_string(),
            shared_wallet_id: template.shared_wallet_id.clone(),
            title: template.title.clone(),
            amount: template.amount,
            currency: Some(template.currency.clone()),
            category: template.category.clone(),
            transaction_type: template.transaction_type,
            event_date,
            note: template.note.clone(),
            attachment_url: None,
        }
    }
}

/// Partial update. `None` leaves a field unchanged.
///
/// `shared_wallet_id` distinguishes "absent" (`None`) from an explicit
/// `null` (`Some(None)`), which detaches the transaction from its wallet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionUpdate {
    pub title: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    pub event_date: Option<NaiveDate>,
    pub note: Option<String>,
    pub attachment_url: Option<String>,
    #[serde(
        default,
        with = "::serde_with::rust::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub shared_wallet_id: Option<Option<String>>,
}

impl TransactionUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.amount.is_none()
            && self.currency.is_none()
            && self.category.is_none()
            && self.transaction_type.is_none()
            && self.event_date.is_none()
            && self.note.is_none()
            && self.attachment_url.is_none()
            && self.shared_wallet_id.is_none()
    }

    /// Returns `existing` with every present field overridden.
    pub fn apply_to(&self, existing: &Transaction) -> Transaction {
        let mut updated = existing.clone();
        if let Some(title) = &self.title {
            updated.title = title.trim().to_string();
        }
        if let Some(amount) = self.amount {
            updated.amount = round_ledger(amount);
        }
        if let Some(currency) = &self.currency {
            updated.currency = normalize_currency(Some(currency));
        }
        if let Some(category) = &self.category {
            updated.category = category.trim().to_string();
        }
        if let Some(transaction_type) = self.transaction_type {
            updated.transaction_type = transaction_type;
        }
        if let Some(event_date) = self.event_date {
            updated.event_date = event_date;
        }
        if let Some(note) = &self.note {
            updated.note = Some(note.clone());
        }
        if let Some(attachment_url) = &self.attachment_url {
            updated.attachment_url = Some(attachment_url.clone());
        }
        if let Some(wallet) = &self.shared_wallet_id {
            updated.shared_wallet_id = wallet.clone().filter(|w| !w.trim().is_empty());
        }
        updated
    }
}

/// Query filter for listing a user's transactions. Every bound is inclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub categories: Option<Vec<String>>,
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub shared_wallet_id: Option<String>,
}

impl TransactionFilter {
    /// Expenses of one month, optionally restricted to a category.
    pub fn expenses_between(from: NaiveDate, to: NaiveDate, category: Option<&str>) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            categories: category.map(|c| vec![c.to_string()]),
            transaction_type: Some(TransactionType::Expense),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(Error::invalid_input(format!(
                    "Filter start {} is after end {}",
                    from, to
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.min_amount, self.max_amount) {
            if min > max {
                return Err(Error::invalid_input(format!(
                    "Filter minimum {} is above maximum {}",
                    min, max
                )));
            }
        }
        Ok(())
    }

    pub fn matches(&self, transaction: &Transaction) -> bool {
        if self.from.is_some_and(|from| transaction.event_date < from) {
            return false;
        }
        if self.to.is_some_and(|to| transaction.event_date > to) {
            return false;
        }
        if let Some(categories) = &self.categories {
            if !categories.iter().any(|c| c == &transaction.category) {
                return false;
            }
        }
        if self
            .transaction_type
            .is_some_and(|t| t != transaction.transaction_type)
        {
            return false;
        }
        if self.min_amount.is_some_and(|min| transaction.amount < min) {
            return false;
        }
        if self.max_amount.is_some_and(|max| transaction.amount > max) {
            return false;
        }
        if let Some(wallet_id) = &self.shared_wallet_id {
            if transaction.shared_wallet_id.as_ref() != Some(wallet_id) {
                return false;
            }
        }
        true
    }
}

/// Income/expense totals over a set of transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net_balance: Decimal,
}

impl TransactionSummary {
    pub fn from_transactions<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Self {
        let (income, expense) = transactions.into_iter().fold(
            (Decimal::ZERO, Decimal::ZERO),
            |(income, expense), t| match t.transaction_type {
                TransactionType::Income => (income + t.amount, expense),
                TransactionType::Expense => (income, expense + t.amount),
            },
        );
        Self {
            total_income: round_ledger(income),
            total_expense: round_ledger(expense),
            net_balance: round_ledger(income - expense),
        }
    }
}

fn normalize_currency(currency: Option<&str>) -> String {
    currency
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
}

fn validate_fields(
    title: &str,
    amount: Decimal,
    currency: &str,
    category: &str,
    note: Option<&str>,
    attachment_url: Option<&str>,
) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::invalid_input("Transaction title cannot be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(Error::invalid_input(format!(
            "Transaction title exceeds {} characters",
            MAX_TITLE_LEN
        )));
    }
    if amount <= Decimal::ZERO {
        return Err(Error::invalid_input(
            "Transaction amount must be greater than zero",
        ));
    }
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(Error::invalid_input(format!(
            "Currency '{}' is not a 3-letter ISO code",
            currency
        )));
    }
    if category.trim().is_empty() {
        return Err(Error::invalid_input("Transaction category cannot be empty"));
    }
    if category.chars().count() > MAX_CATEGORY_LEN {
        return Err(Error::invalid_input(format!(
            "Category exceeds {} characters",
            MAX_CATEGORY_LEN
        )));
    }
    if note.is_some_and(|n| n.chars().count() > MAX_NOTE_LEN) {
        return Err(Error::invalid_input(format!(
            "Note exceeds {} characters",
            MAX_NOTE_LEN
        )));
    }
    if attachment_url.is_some_and(|u| u.chars().count() > MAX_ATTACHMENT_URL_LEN) {
        return Err(Error::invalid_input(format!(
            "Attachment URL exceeds {} characters",
            MAX_ATTACHMENT_URL_LEN
        )));
    }
    Ok(())
}
