//! Temp-file databases for repository tests.

use std::sync::Arc;

use chrono::NaiveDate;
use fintrack_core::transactions::{NewTransaction, TransactionType};
use rust_decimal::Decimal;
use tempfile::TempDir;

use crate::db::{create_pool, run_migrations, spawn_writer, DbPool, WriteHandle};

pub struct TestDb {
    pub pool: Arc<DbPool>,
    pub writer: WriteHandle,
    // Keeps the database file alive for the test's duration.
    _dir: TempDir,
}

/// Must be called inside a Tokio runtime; the writer is a spawned task.
pub fn test_db() -> TestDb {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = dir.path().join("test.db").to_string_lossy().into_owned();
    let pool = create_pool(&db_path).expect("Failed to create pool");
    run_migrations(&pool).expect("Failed to run migrations");
    let writer = spawn_writer((*pool).clone());
    TestDb {
        pool,
        writer,
        _dir: dir,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn new_expense(user_id: &str, category: &str, amount: Decimal, on: NaiveDate) -> NewTransaction {
    NewTransaction {
        id: None,
        user_id: user_id.to_string(),
        shared_wallet_id: None,
        title: format!("{} expense", category),
        amount,
        currency: None,
        category: category.to_string(),
        transaction_type: TransactionType::Expense,
        event_date: on,
        note: None,
        attachment_url: None,
    }
}
