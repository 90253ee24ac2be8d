//! Shared-wallet settlement.
//!
//! A member's running balance is recomputed from the wallet's whole
//! transaction history on every change:
//!
//! ```text
//! balance(m) = Σ expense: [payer == m]·A − A·ratio(m)
//!            + Σ income:  A·ratio(m) − [payer == m]·A
//! ```
//!
//! Sums are kept at full precision and rounded half-up to ledger scale once
//! per member at the end.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};
use rust_decimal::Decimal;

use super::shared_wallets_model::{MemberBalanceUpdate, RatioIntegrity, SharedWalletMember};
use super::shared_wallets_traits::SharedWalletRepositoryTrait;
use crate::constants::RATIO_EPSILON;
use crate::errors::{Error, Result, ValidationError};
use crate::money::round_ledger;
use crate::transactions::{
    ChangeKind, Transaction, TransactionRepositoryTrait, TransactionType,
};
use crate::utils::keyed_lock::{wallet_key, KeyedLocks};

/// Running balance per member user id.
pub fn compute_balances(
    members: &[SharedWalletMember],
    transactions: &[Transaction],
) -> HashMap<String, Decimal> {
    let mut balances: HashMap<String, Decimal> = members
        .iter()
        .map(|m| (m.member_id.clone(), Decimal::ZERO))
        .collect();

    for transaction in transactions {
        // Expenses are owed by every member and credited to the payer;
        // income is the mirror image.
        let sign = match transaction.transaction_type {
            TransactionType::Expense => Decimal::ONE,
            TransactionType::Income => Decimal::NEGATIVE_ONE,
        };
        let amount = transaction.amount * sign;

        for member in members {
            if let Some(balance) = balances.get_mut(&member.member_id) {
                *balance -= amount * member.share_ratio;
            }
        }
        match balances.get_mut(&transaction.user_id) {
            Some(balance) => *balance += amount,
            None => warn!(
                "Payer {} of transaction {} is not a member of its wallet; payer credit skipped",
                transaction.user_id, transaction.id
            ),
        }
    }

    balances
        .into_iter()
        .map(|(member, balance)| (member, round_ledger(balance)))
        .collect()
}

/// Rejects ratios outside [0, 1] or a sum above 1 (within tolerance).
pub fn validate_ratios<I>(wallet_id: &str, ratios: I) -> Result<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    let mut total = Decimal::ZERO;
    for ratio in ratios {
        if ratio < Decimal::ZERO || ratio > Decimal::ONE {
            return Err(Error::invalid_input(format!(
                "Share ratio {} must be between 0 and 1",
                ratio
            )));
        }
        total += ratio;
    }
    if total > Decimal::ONE + RATIO_EPSILON {
        return Err(ValidationError::RatioSumExceeded {
            wallet_id: wallet_id.to_string(),
            total: total.to_string(),
        }
        .into());
    }
    Ok(total)
}

pub fn ratio_integrity(wallet_id: &str, members: &[SharedWalletMember]) -> RatioIntegrity {
    let total_ratio: Decimal = members.iter().map(|m| m.share_ratio).sum();
    RatioIntegrity {
        wallet_id: wallet_id.to_string(),
        total_ratio,
        is_balanced: (total_ratio - Decimal::ONE).abs() <= RATIO_EPSILON,
    }
}

/// Recomputes and persists member balances of shared wallets.
pub struct SettlementEngine {
    wallet_repository: Arc<dyn SharedWalletRepositoryTrait>,
    transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    locks: Arc<KeyedLocks>,
}

impl SettlementEngine {
    pub fn new(
        wallet_repository: Arc<dyn SharedWalletRepositoryTrait>,
        transaction_repository: Arc<dyn TransactionRepositoryTrait>,
        locks: Arc<KeyedLocks>,
    ) -> Self {
        Self {
            wallet_repository,
            transaction_repository,
            locks,
        }
    }

    pub async fn on_wallet_transaction_changed(
        &self,
        wallet_id: &str,
        transaction: &Transaction,
        change: ChangeKind,
    ) -> Result<Vec<SharedWalletMember>> {
        debug!(
            "Settling wallet {} after {:?} of transaction {}",
            wallet_id, change, transaction.id
        );
        self.recompute_wallet(wallet_id).await
    }

    /// Recomputes every balance of a wallet under its lock, retrying once
    /// on a version conflict.
    pub async fn recompute_wallet(&self, wallet_id: &str) -> Result<Vec<SharedWalletMember>> {
        let _guard = self.locks.lock(&wallet_key(wallet_id)).await;
        self.recompute_locked(wallet_id).await
    }

    /// Same as [`recompute_wallet`](Self::recompute_wallet) for callers that
    /// already hold the wallet lock.
    pub(crate) async fn recompute_locked(
        &self,
        wallet_id: &str,
    ) -> Result<Vec<SharedWalletMember>> {
        match self.try_recompute(wallet_id).await {
            Err(e) if e.is_concurrency_conflict() => {
                warn!("Wallet {} changed during settlement, retrying: {}", wallet_id, e);
                self.try_recompute(wallet_id).await
            }
            result => result,
        }
    }

    pub fn ratio_integrity(&self, wallet_id: &str) -> Result<RatioIntegrity> {
        self.wallet_repository.get_wallet(wallet_id)?;
        let members = self.wallet_repository.list_members(wallet_id)?;
        Ok(ratio_integrity(wallet_id, &members))
    }

    async fn try_recompute(&self, wallet_id: &str) -> Result<Vec<SharedWalletMember>> {
        self.wallet_repository.get_wallet(wallet_id)?;
        let members = self.wallet_repository.list_members(wallet_id)?;
        let transactions = self.transaction_repository.list_by_wallet(wallet_id)?;

        let integrity = ratio_integrity(wallet_id, &members);
        if !integrity.is_balanced {
            warn!(
                "Share ratios of wallet {} sum to {}; balances will not net to zero",
                wallet_id, integrity.total_ratio
            );
        }

        let balances = compute_balances(&members, &transactions);
        let updates: Vec<MemberBalanceUpdate> = members
            .iter()
            .filter_map(|m| {
                let balance = balances
                    .get(&m.member_id)
                    .copied()
                    .unwrap_or(Decimal::ZERO);
                (balance != m.running_balance).then(|| MemberBalanceUpdate {
                    member_id: m.member_id.clone(),
                    expected_version: m.version,
                    running_balance: balance,
                })
            })
            .collect();

        if updates.is_empty() {
            return Ok(members);
        }
        debug!(
            "Wallet {}: writing {} balance(s) over {} transaction(s)",
            wallet_id,
            updates.len(),
            transactions.len()
        );
        self.wallet_repository
            .update_balances(wallet_id, updates)
            .await?;
        self.wallet_repository.list_members(wallet_id)
    }
}
