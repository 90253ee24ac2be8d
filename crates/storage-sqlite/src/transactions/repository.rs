use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::Sqlite;
use diesel::SqliteConnection;

use fintrack_core::errors::{Error, Result};
use fintrack_core::transactions::{
    NewTransaction, Transaction, TransactionFilter, TransactionRepositoryTrait,
};

use super::model::TransactionDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::transactions;
use crate::utils::{format_date, format_instant};

pub struct TransactionRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl TransactionRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    fn load(&self, query: transactions::BoxedQuery<'_, Sqlite>) -> Result<Vec<Transaction>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = query
            .order((transactions::event_date.asc(), transactions::created_at.asc()))
            .select(TransactionDB::as_select())
            .load::<TransactionDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(|row| Transaction::try_from(row).map_err(Error::from))
            .collect()
    }
}

/// Inserts a transaction on a connection that is already inside a write
/// transaction.
pub(crate) fn insert_transaction(
    conn: &mut SqliteConnection,
    new_transaction: NewTransaction,
) -> Result<Transaction> {
    let row = TransactionDB::from_new(new_transaction, Utc::now());
    let inserted = diesel::insert_into(transactions::table)
        .values(&row)
        .returning(TransactionDB::as_returning())
        .get_result(conn)
        .map_err(StorageError::from)?;
    Ok(Transaction::try_from(inserted)?)
}

#[async_trait]
impl TransactionRepositoryTrait for TransactionRepository {
    async fn create(&self, new_transaction: NewTransaction) -> Result<Transaction> {
        self.writer
            .exec(move |conn| insert_transaction(conn, new_transaction))
            .await
    }

    async fn update(&self, transaction: Transaction) -> Result<Transaction> {
        let mut row = TransactionDB::from(&transaction);
        row.updated_at = format_instant(Utc::now());

        self.writer
            .exec(move |conn| -> Result<Transaction> {
                let updated = diesel::update(transactions::table.find(&row.id))
                    .set(&row)
                    .returning(TransactionDB::as_returning())
                    .get_result(conn)
                    .optional()
                    .map_err(StorageError::from)?
                    .ok_or_else(|| Error::not_found("Transaction", &row.id))?;
                Ok(Transaction::try_from(updated)?)
            })
            .await
    }

    async fn delete(&self, transaction_id: &str) -> Result<usize> {
        let transaction_id = transaction_id.to_string();
        self.writer
            .exec(move |conn| -> Result<usize> {
                Ok(diesel::delete(transactions::table.find(transaction_id))
                    .execute(conn)
                    .map_err(StorageError::from)?)
            })
            .await
    }

    fn get_by_id(&self, transaction_id: &str) -> Result<Transaction> {
        self.find_by_id(transaction_id)?
            .ok_or_else(|| Error::not_found("Transaction", transaction_id))
    }

    fn find_by_id(&self, transaction_id: &str) -> Result<Option<Transaction>> {
        let mut conn = get_connection(&self.pool)?;
        let row = transactions::table
            .find(transaction_id)
            .select(TransactionDB::as_select())
            .first::<TransactionDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(Transaction::try_from).transpose()?)
    }

    /// Date, category, type and wallet filters run in SQL. Amount bounds are
    /// applied after decoding since amounts are stored as text.
    fn list(&self, user_id: &str, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let mut query = transactions::table
            .filter(transactions::user_id.eq(user_id.to_string()))
            .into_boxed();
        if let Some(from) = filter.from {
            query = query.filter(transactions::event_date.ge(format_date(from)));
        }
        if let Some(to) = filter.to {
            query = query.filter(transactions::event_date.le(format_date(to)));
        }
        if let Some(categories) = &filter.categories {
            query = query.filter(transactions::category.eq_any(categories.clone()));
        }
        if let Some(transaction_type) = filter.transaction_type {
            query = query.filter(transactions::transaction_type.eq(transaction_type.as_str()));
        }
        if let Some(wallet_id) = &filter.shared_wallet_id {
            query = query.filter(transactions::shared_wallet_id.eq(wallet_id.clone()));
        }

        let rows = self.load(query)?;
        Ok(rows.into_iter().filter(|t| filter.matches(t)).collect())
    }

    fn list_by_wallet(&self, wallet_id: &str) -> Result<Vec<Transaction>> {
        let query = transactions::table
            .filter(transactions::shared_wallet_id.eq(wallet_id.to_string()))
            .into_boxed();
        self.load(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{date, new_expense, test_db};
    use fintrack_core::transactions::TransactionType;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_create_and_read_back() {
        let db = test_db();
        let repo = TransactionRepository::new(db.pool.clone(), db.writer.clone());

        let created = repo
            .create(new_expense("u1", "Food", dec!(12.34), date(2024, 3, 5)).normalized())
            .await
            .unwrap();
        assert_eq!(created.currency, "USD");

        let loaded = repo.get_by_id(&created.id).unwrap();
        assert_eq!(loaded, created);
        assert_eq!(loaded.amount, dec!(12.34));
        assert_eq!(loaded.event_date, date(2024, 3, 5));
        assert!(repo.find_by_id("missing").unwrap().is_none());
        assert!(repo.get_by_id("missing").unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_applies_every_filter() {
        let db = test_db();
        let repo = TransactionRepository::new(db.pool.clone(), db.writer.clone());
        for (category, amount, day) in [
            ("Food", dec!(5), 1),
            ("Food", dec!(50), 10),
            ("Rent", dec!(900), 15),
            ("Food", dec!(500), 31),
        ] {
            repo.create(new_expense("u1", category, amount, date(2024, 3, day)))
                .await
                .unwrap();
        }
        repo.create(new_expense("u2", "Food", dec!(50), date(2024, 3, 10)))
            .await
            .unwrap();
        let mut salary = new_expense("u1", "Salary", dec!(3000), date(2024, 3, 25));
        salary.transaction_type = TransactionType::Income;
        repo.create(salary).await.unwrap();

        let all = repo.list("u1", &TransactionFilter::default()).unwrap();
        assert_eq!(all.len(), 5);
        assert!(all.windows(2).all(|w| w[0].event_date <= w[1].event_date));

        let food_march = repo
            .list(
                "u1",
                &TransactionFilter::expenses_between(date(2024, 3, 1), date(2024, 3, 31), Some("Food")),
            )
            .unwrap();
        assert_eq!(food_march.len(), 3);

        // Amount bounds compare numerically even though amounts are text.
        let mid_range = repo
            .list(
                "u1",
                &TransactionFilter {
                    min_amount: Some(dec!(9)),
                    max_amount: Some(dec!(600)),
                    ..Default::default()
                },
            )
            .unwrap();
        let amounts: Vec<_> = mid_range.iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![dec!(50), dec!(500)]);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = test_db();
        let repo = TransactionRepository::new(db.pool.clone(), db.writer.clone());
        let mut transaction = repo
            .create(new_expense("u1", "Food", dec!(10), date(2024, 3, 5)))
            .await
            .unwrap();

        transaction.amount = dec!(11.50);
        transaction.note = Some("lunch".to_string());
        let updated = repo.update(transaction.clone()).await.unwrap();
        assert_eq!(updated.amount, dec!(11.50));
        assert_eq!(updated.note.as_deref(), Some("lunch"));
        assert_eq!(updated.created_at, transaction.created_at);

        // Clearing an optional column writes NULL.
        let mut cleared = updated.clone();
        cleared.note = None;
        assert!(repo.update(cleared).await.unwrap().note.is_none());

        assert_eq!(repo.delete(&transaction.id).await.unwrap(), 1);
        assert_eq!(repo.delete(&transaction.id).await.unwrap(), 0);

        transaction.id = "missing".to_string();
        assert!(repo.update(transaction).await.unwrap_err().is_not_found());
    }
}
