//! Database models for transactions.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::str::FromStr;
use uuid::Uuid;

use fintrack_core::transactions::{NewTransaction, Transaction, TransactionType};

use crate::errors::StorageError;
use crate::utils::{format_date, format_instant, parse_date, parse_decimal, parse_timestamp};

#[derive(
    Queryable, Identifiable, Insertable, AsChangeset, Selectable, PartialEq, Debug, Clone,
)]
#[diesel(table_name = crate::schema::transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct TransactionDB {
    pub id: String,
    pub user_id: String,
    pub shared_wallet_id: Option<String>,
    pub title: String,
    pub amount: String,
    pub currency: String,
    pub category: String,
    pub transaction_type: String,
    pub event_date: String,
    pub note: Option<String>,
    pub attachment_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TransactionDB {
    pub fn from_new(new_transaction: NewTransaction, now: DateTime<Utc>) -> Self {
        let currency = new_transaction.currency_or_default();
        let stamp = format_instant(now);
        Self {
            id: new_transaction
                .id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            user_id: new_transaction.user_id,
            shared_wallet_id: new_transaction.shared_wallet_id,
            title: new_transaction.title,
            amount: new_transaction.amount.to_string(),
            currency,
            category: new_transaction.category,
            transaction_type: new_transaction.transaction_type.as_str().to_string(),
            event_date: format_date(new_transaction.event_date),
            note: new_transaction.note,
            attachment_url: new_transaction.attachment_url,
            created_at: stamp.clone(),
            updated_at: stamp,
        }
    }
}

impl From<&Transaction> for TransactionDB {
    fn from(domain: &Transaction) -> Self {
        Self {
            id: domain.id.clone(),
            user_id: domain.user_id.clone(),
            shared_wallet_id: domain.shared_wallet_id.clone(),
            title: domain.title.clone(),
            amount: domain.amount.to_string(),
            currency: domain.currency.clone(),
            category: domain.category.clone(),
            transaction_type: domain.transaction_type.as_str().to_string(),
            event_date: format_date(domain.event_date),
            note: domain.note.clone(),
            attachment_url: domain.attachment_url.clone(),
            created_at: format_instant(domain.created_at),
            updated_at: format_instant(domain.updated_at),
        }
    }
}

impl TryFrom<TransactionDB> for Transaction {
    type Error = StorageError;

    fn try_from(db: TransactionDB) -> Result<Self, Self::Error> {
        Ok(Self {
            amount: parse_decimal(&db.amount, "transactions.amount")?,
            transaction_type: TransactionType::from_str(&db.transaction_type)
                .map_err(|e| StorageError::corrupt("transactions.transaction_type", e))?,
            event_date: parse_date(&db.event_date, "transactions.event_date")?,
            created_at: parse_timestamp(&db.created_at, "transactions.created_at")?,
            updated_at: parse_timestamp(&db.updated_at, "transactions.updated_at")?,
            id: db.id,
            user_id: db.user_id,
            shared_wallet_id: db.shared_wallet_id,
            title: db.title,
            currency: db.currency,
            category: db.category,
            note: db.note,
            attachment_url: db.attachment_url,
        })
    }
}
