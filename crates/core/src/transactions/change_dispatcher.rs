use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use log::error;

use super::transactions_model::{ChangeKind, Transaction};
use super::transactions_traits::TransactionChangeHandlerTrait;
use crate::budgets::BudgetReconciler;
use crate::shared_wallets::SettlementEngine;

/// Routes committed transaction changes to budget reconciliation and
/// wallet settlement.
///
/// An update that moves a transaction to another month, category or wallet
/// reconciles the old scope as well as the new one.
pub struct TransactionChangeDispatcher {
    budget_reconciler: Arc<BudgetReconciler>,
    settlement_engine: Arc<SettlementEngine>,
}

impl TransactionChangeDispatcher {
    pub fn new(
        budget_reconciler: Arc<BudgetReconciler>,
        settlement_engine: Arc<SettlementEngine>,
    ) -> Self {
        Self {
            budget_reconciler,
            settlement_engine,
        }
    }

    async fn reconcile_budgets(&self, transaction: &Transaction, change: ChangeKind) {
        if let Err(e) = self
            .budget_reconciler
            .on_transaction_changed(transaction, change)
            .await
        {
            error!(
                "Budget reconciliation after {:?} of transaction {} failed: {}",
                change, transaction.id, e
            );
        }
    }
}

#[async_trait]
impl TransactionChangeHandlerTrait for TransactionChangeDispatcher {
    async fn on_transaction_changed(
        &self,
        current: &Transaction,
        previous: Option<&Transaction>,
        change: ChangeKind,
    ) {
        self.reconcile_budgets(current, change).await;
        if let Some(previous) = previous {
            if previous.budget_scope() != current.budget_scope() {
                self.reconcile_budgets(previous, change).await;
            }
        }

        let wallets: BTreeSet<&str> = std::iter::once(current)
            .chain(previous)
            .filter_map(|t| t.shared_wallet_id.as_deref())
            .collect();
        for wallet_id in wallets {
            if let Err(e) = self
                .settlement_engine
                .on_wallet_transaction_changed(wallet_id, current, change)
                .await
            {
                error!(
                    "Settlement of wallet {} after {:?} of transaction {} failed: {}",
                    wallet_id, change, current.id, e
                );
            }
        }
    }
}
