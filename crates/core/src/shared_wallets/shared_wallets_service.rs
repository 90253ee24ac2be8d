use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};

use super::settlement::{ratio_integrity, validate_ratios, SettlementEngine};
use super::shared_wallets_model::{
    validate_wallet_name, NewSharedWallet, NewWalletMember, RatioIntegrity, SharedWallet,
    SharedWalletDetails, SharedWalletMember, WalletMemberUpdate,
};
use super::shared_wallets_traits::{SharedWalletRepositoryTrait, SharedWalletServiceTrait};
use crate::errors::{Error, Result, ValidationError};
use crate::notifications::{notify_best_effort, NotificationSink, NotificationType};
use crate::utils::keyed_lock::{wallet_key, KeyedLocks};

/// Service for shared wallets and their memberships.
///
/// Membership changes hold the wallet lock from ratio validation through
/// the balance recompute, so two concurrent additions cannot both pass the
/// ratio check.
pub struct SharedWalletService {
    repository: Arc<dyn SharedWalletRepositoryTrait>,
    settlement_engine: Arc<SettlementEngine>,
    notification_sink: Arc<dyn NotificationSink>,
    locks: Arc<KeyedLocks>,
}

impl SharedWalletService {
    pub fn new(
        repository: Arc<dyn SharedWalletRepositoryTrait>,
        settlement_engine: Arc<SettlementEngine>,
        notification_sink: Arc<dyn NotificationSink>,
        locks: Arc<KeyedLocks>,
    ) -> Self {
        Self {
            repository,
            settlement_engine,
            notification_sink,
            locks,
        }
    }

    fn require_member(&self, wallet_id: &str, member_id: &str) -> Result<SharedWalletMember> {
        self.repository
            .find_member(wallet_id, member_id)?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "Member '{}' of shared wallet '{}'",
                    member_id, wallet_id
                ))
            })
    }

    async fn try_update_member(
        &self,
        wallet_id: &str,
        member_id: &str,
        update: &WalletMemberUpdate,
    ) -> Result<SharedWalletMember> {
        let existing = self.require_member(wallet_id, member_id)?;
        let updated = update.apply_to(&existing);
        let members = self.repository.list_members(wallet_id)?;
        validate_ratios(
            wallet_id,
            members
                .iter()
                .filter(|m| m.member_id != member_id)
                .map(|m| m.share_ratio)
                .chain(std::iter::once(updated.share_ratio)),
        )?;
        self.repository.update_member(updated).await
    }

    /// Recomputes balances after a membership change and warns the owner
    /// when the ratios no longer add up to one.
    async fn settle_after_membership_change(
        &self,
        wallet: &SharedWallet,
    ) -> Result<Vec<SharedWalletMember>> {
        let members = self.settlement_engine.recompute_locked(&wallet.id).await?;
        let integrity = ratio_integrity(&wallet.id, &members);
        if !integrity.is_balanced {
            notify_best_effort(
                self.notification_sink.as_ref(),
                &wallet.owner_id,
                NotificationType::SharedWalletRatioDeviation,
                "Shared wallet ratios",
                &format!(
                    "Share ratios of '{}' add up to {} instead of 1.",
                    wallet.name,
                    integrity.total_ratio.normalize()
                ),
            )
            .await;
        }
        Ok(members)
    }

    fn find_in(members: Vec<SharedWalletMember>, member_id: &str) -> Option<SharedWalletMember> {
        members.into_iter().find(|m| m.member_id == member_id)
    }
}

#[async_trait]
impl SharedWalletServiceTrait for SharedWalletService {
    async fn create_wallet(&self, new_wallet: NewSharedWallet) -> Result<SharedWalletDetails> {
        let new_wallet = new_wallet.normalized();
        new_wallet.validate()?;
        if self
            .repository
            .exists_by_owner_and_name(&new_wallet.owner_id, &new_wallet.name)?
        {
            return Err(ValidationError::Duplicate(format!(
                "Shared wallet '{}' already exists",
                new_wallet.name
            ))
            .into());
        }

        let (wallet, owner) = self.repository.create_wallet(new_wallet).await?;
        info!("Created shared wallet {} for owner {}", wallet.id, wallet.owner_id);
        let members = vec![owner];
        Ok(SharedWalletDetails {
            ratio_integrity: ratio_integrity(&wallet.id, &members),
            wallet,
            members,
        })
    }

    async fn rename_wallet(&self, wallet_id: &str, name: &str) -> Result<SharedWallet> {
        let name = name.trim();
        validate_wallet_name(name)?;
        let wallet = self.repository.get_wallet(wallet_id)?;
        if wallet.name == name {
            return Ok(wallet);
        }
        if !wallet.name.eq_ignore_ascii_case(name)
            && self.repository.exists_by_owner_and_name(&wallet.owner_id, name)?
        {
            return Err(ValidationError::Duplicate(format!(
                "Shared wallet '{}' already exists",
                name
            ))
            .into());
        }
        self.repository.rename_wallet(wallet_id, name).await
    }

    async fn delete_wallet(&self, wallet_id: &str) -> Result<()> {
        let _guard = self.locks.lock(&wallet_key(wallet_id)).await;
        if self.repository.delete_wallet(wallet_id).await? == 0 {
            return Err(Error::not_found("Shared wallet", wallet_id));
        }
        info!("Deleted shared wallet {}", wallet_id);
        Ok(())
    }

    fn get_wallet_details(&self, wallet_id: &str) -> Result<SharedWalletDetails> {
        let wallet = self.repository.get_wallet(wallet_id)?;
        let members = self.repository.list_members(wallet_id)?;
        Ok(SharedWalletDetails {
            ratio_integrity: ratio_integrity(wallet_id, &members),
            wallet,
            members,
        })
    }

    fn list_wallets(&self, owner_id: &str) -> Result<Vec<SharedWallet>> {
        self.repository.list_wallets_by_owner(owner_id)
    }

    fn list_memberships(&self, member_id: &str) -> Result<Vec<SharedWalletMember>> {
        self.repository.list_memberships(member_id)
    }

    async fn add_member(&self, new_member: NewWalletMember) -> Result<SharedWalletMember> {
        new_member.validate()?;
        let wallet_id = new_member.wallet_id.clone();
        let member_id = new_member.member_id.clone();

        let _guard = self.locks.lock(&wallet_key(&wallet_id)).await;
        let wallet = self.repository.get_wallet(&wallet_id)?;
        let members = self.repository.list_members(&wallet_id)?;
        if members.iter().any(|m| m.member_id == member_id) {
            return Err(ValidationError::Duplicate(format!(
                "User {} is already a member of shared wallet {}",
                member_id, wallet_id
            ))
            .into());
        }
        validate_ratios(
            &wallet_id,
            members
                .iter()
                .map(|m| m.share_ratio)
                .chain(std::iter::once(new_member.share_ratio)),
        )?;

        let added = self.repository.add_member(new_member).await?;
        debug!("Added member {} to shared wallet {}", member_id, wallet_id);
        let members = self.settle_after_membership_change(&wallet).await?;
        Ok(Self::find_in(members, &member_id).unwrap_or(added))
    }

    async fn update_member(
        &self,
        wallet_id: &str,
        member_id: &str,
        update: WalletMemberUpdate,
    ) -> Result<SharedWalletMember> {
        update.validate()?;
        let _guard = self.locks.lock(&wallet_key(wallet_id)).await;
        let wallet = self.repository.get_wallet(wallet_id)?;

        let updated = match self.try_update_member(wallet_id, member_id, &update).await {
            Err(e) if e.is_concurrency_conflict() => {
                warn!(
                    "Member {} of wallet {} changed during update, retrying: {}",
                    member_id, wallet_id, e
                );
                self.try_update_member(wallet_id, member_id, &update).await?
            }
            result => result?,
        };

        let members = self.settle_after_membership_change(&wallet).await?;
        Ok(Self::find_in(members, member_id).unwrap_or(updated))
    }

    async fn remove_member(&self, wallet_id: &str, member_id: &str) -> Result<()> {
        let _guard = self.locks.lock(&wallet_key(wallet_id)).await;
        let wallet = self.repository.get_wallet(wallet_id)?;
        if wallet.owner_id == member_id {
            return Err(Error::invalid_input(
                "The wallet owner cannot leave their own wallet; delete the wallet instead",
            ));
        }
        self.require_member(wallet_id, member_id)?;
        self.repository.remove_member(wallet_id, member_id).await?;
        debug!("Removed member {} from shared wallet {}", member_id, wallet_id);
        self.settle_after_membership_change(&wallet).await?;
        Ok(())
    }

    async fn recompute_balances(&self, wallet_id: &str) -> Result<Vec<SharedWalletMember>> {
        self.settlement_engine.recompute_wallet(wallet_id).await
    }

    fn ratio_integrity(&self, wallet_id: &str) -> Result<RatioIntegrity> {
        self.settlement_engine.ratio_integrity(wallet_id)
    }
}
