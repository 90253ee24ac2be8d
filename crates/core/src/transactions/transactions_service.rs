use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};

use super::transactions_model::{
    ChangeKind, NewTransaction, Transaction, TransactionFilter, TransactionSummary,
    TransactionUpdate,
};
use super::transactions_traits::{
    TransactionChangeHandlerTrait, TransactionRepositoryTrait, TransactionServiceTrait,
};
use crate::errors::{Error, Result};
use crate::recurring::RecurringJobRepositoryTrait;
use crate::shared_wallets::SharedWalletRepositoryTrait;

/// Service for managing transactions.
///
/// Every committed mutation is handed to the change handler before the
/// call returns, so budgets and wallet balances are current when the
/// caller sees the result.
pub struct TransactionService {
    repository: Arc<dyn TransactionRepositoryTrait>,
    wallet_repository: Arc<dyn SharedWalletRepositoryTrait>,
    recurring_repository: Arc<dyn RecurringJobRepositoryTrait>,
    change_handler: Arc<dyn TransactionChangeHandlerTrait>,
}

impl TransactionService {
    pub fn new(
        repository: Arc<dyn TransactionRepositoryTrait>,
        wallet_repository: Arc<dyn SharedWalletRepositoryTrait>,
        recurring_repository: Arc<dyn RecurringJobRepositoryTrait>,
        change_handler: Arc<dyn TransactionChangeHandlerTrait>,
    ) -> Self {
        Self {
            repository,
            wallet_repository,
            recurring_repository,
            change_handler,
        }
    }

    /// The wallet must exist and the payer must be one of its members.
    fn ensure_wallet_member(&self, wallet_id: &str, user_id: &str) -> Result<()> {
        self.wallet_repository.get_wallet(wallet_id)?;
        if self
            .wallet_repository
            .find_member(wallet_id, user_id)?
            .is_none()
        {
            return Err(Error::invalid_input(format!(
                "User {} is not a member of shared wallet {}",
                user_id, wallet_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionServiceTrait for TransactionService {
    async fn create_transaction(&self, new_transaction: NewTransaction) -> Result<Transaction> {
        let new_transaction = new_transaction.normalized();
        new_transaction.validate()?;
        if let Some(wallet_id) = &new_transaction.shared_wallet_id {
            self.ensure_wallet_member(wallet_id, &new_transaction.user_id)?;
        }

        let created = self.repository.create(new_transaction).await?;
        debug!("Created transaction {} for user {}", created.id, created.user_id);
        self.change_handler
            .on_transaction_changed(&created, None, ChangeKind::Created)
            .await;
        Ok(created)
    }

    async fn update_transaction(
        &self,
        transaction_id: &str,
        update: TransactionUpdate,
    ) -> Result<Transaction> {
        let existing = self.repository.get_by_id(transaction_id)?;
        if update.is_empty() {
            return Ok(existing);
        }

        let updated = update.apply_to(&existing);
        updated.validate()?;
        if updated.shared_wallet_id != existing.shared_wallet_id {
            if let Some(wallet_id) = &updated.shared_wallet_id {
                self.ensure_wallet_member(wallet_id, &updated.user_id)?;
            }
        }

        let saved = self.repository.update(updated).await?;
        self.change_handler
            .on_transaction_changed(&saved, Some(&existing), ChangeKind::Updated)
            .await;
        Ok(saved)
    }

    async fn delete_transaction(&self, transaction_id: &str) -> Result<Transaction> {
        let existing = self.repository.get_by_id(transaction_id)?;
        self.repository.delete(transaction_id).await?;

        // A failure here is healed by the runner, which deactivates jobs
        // whose template is gone.
        match self
            .recurring_repository
            .deactivate_by_template(transaction_id)
            .await
        {
            Ok(0) => {}
            Ok(count) => debug!(
                "Deactivated {} recurring job(s) built on transaction {}",
                count, transaction_id
            ),
            Err(e) => warn!(
                "Could not deactivate recurring jobs of deleted transaction {}: {}",
                transaction_id, e
            ),
        }

        self.change_handler
            .on_transaction_changed(&existing, None, ChangeKind::Deleted)
            .await;
        Ok(existing)
    }

    fn get_transaction(&self, transaction_id: &str) -> Result<Transaction> {
        self.repository.get_by_id(transaction_id)
    }

    fn list_transactions(
        &self,
        user_id: &str,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>> {
        filter.validate()?;
        self.repository.list(user_id, filter)
    }

    fn get_summary(
        &self,
        user_id: &str,
        filter: &TransactionFilter,
    ) -> Result<TransactionSummary> {
        let transactions = self.list_transactions(user_id, filter)?;
        Ok(TransactionSummary::from_transactions(&transactions))
    }
}
