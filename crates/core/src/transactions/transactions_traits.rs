//! Transaction repository, service and change-handler traits.

use async_trait::async_trait;

use super::transactions_model::{
    ChangeKind, NewTransaction, Transaction, TransactionFilter, TransactionSummary,
    TransactionUpdate,
};
use crate::errors::Result;

/// Persistence contract for transactions.
#[async_trait]
pub trait TransactionRepositoryTrait: Send + Sync {
    /// Inserts a validated, normalized transaction.
    async fn create(&self, new_transaction: NewTransaction) -> Result<Transaction>;

    /// Overwrites every mutable field of an existing transaction.
    async fn update(&self, transaction: Transaction) -> Result<Transaction>;

    /// Returns the number of deleted records.
    async fn delete(&self, transaction_id: &str) -> Result<usize>;

    fn get_by_id(&self, transaction_id: &str) -> Result<Transaction>;

    /// Like `get_by_id`, but a missing row is `Ok(None)`.
    fn find_by_id(&self, transaction_id: &str) -> Result<Option<Transaction>>;

    /// Lists a user's own transactions matching `filter`, oldest event first.
    fn list(&self, user_id: &str, filter: &TransactionFilter) -> Result<Vec<Transaction>>;

    /// Lists every transaction attached to a shared wallet, across users.
    fn list_by_wallet(&self, wallet_id: &str) -> Result<Vec<Transaction>>;
}

#[async_trait]
pub trait TransactionServiceTrait: Send + Sync {
    async fn create_transaction(&self, new_transaction: NewTransaction) -> Result<Transaction>;

    async fn update_transaction(
        &self,
        transaction_id: &str,
        update: TransactionUpdate,
    ) -> Result<Transaction>;

    /// Deletes a transaction and returns its last state.
    async fn delete_transaction(&self, transaction_id: &str) -> Result<Transaction>;

    fn get_transaction(&self, transaction_id: &str) -> Result<Transaction>;

    fn list_transactions(
        &self,
        user_id: &str,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>>;

    fn get_summary(&self, user_id: &str, filter: &TransactionFilter)
        -> Result<TransactionSummary>;
}

/// Receives every committed transaction change.
///
/// `previous` is the state before an update, so handlers can also repair
/// the scope a transaction moved out of. Handlers never fail the change
/// that triggered them; they log their own errors.
#[async_trait]
pub trait TransactionChangeHandlerTrait: Send + Sync {
    async fn on_transaction_changed(
        &self,
        current: &Transaction,
        previous: Option<&Transaction>,
        change: ChangeKind,
    );
}
