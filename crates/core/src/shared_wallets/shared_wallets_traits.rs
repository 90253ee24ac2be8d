//! Shared wallet repository and service traits.

use async_trait::async_trait;

use super::shared_wallets_model::{
    MemberBalanceUpdate, NewSharedWallet, NewWalletMember, RatioIntegrity, SharedWallet,
    SharedWalletDetails, SharedWalletMember, WalletMemberUpdate,
};
use crate::errors::Result;

/// Persistence contract for shared wallets and their memberships.
#[async_trait]
pub trait SharedWalletRepositoryTrait: Send + Sync {
    /// Inserts the wallet and the owner's admin membership atomically.
    async fn create_wallet(
        &self,
        new_wallet: NewSharedWallet,
    ) -> Result<(SharedWallet, SharedWalletMember)>;

    async fn rename_wallet(&self, wallet_id: &str, name: &str) -> Result<SharedWallet>;

    /// Removes the wallet and its memberships and clears the wallet id of
    /// its transactions, in one store transaction.
    async fn delete_wallet(&self, wallet_id: &str) -> Result<usize>;

    fn get_wallet(&self, wallet_id: &str) -> Result<SharedWallet>;

    fn list_wallets_by_owner(&self, owner_id: &str) -> Result<Vec<SharedWallet>>;

    /// Case-insensitive name lookup among one owner's wallets.
    fn exists_by_owner_and_name(&self, owner_id: &str, name: &str) -> Result<bool>;

    async fn add_member(&self, new_member: NewWalletMember) -> Result<SharedWalletMember>;

    /// Versioned write of ratio and admin flag.
    async fn update_member(&self, member: SharedWalletMember) -> Result<SharedWalletMember>;

    async fn remove_member(&self, wallet_id: &str, member_id: &str) -> Result<usize>;

    fn list_members(&self, wallet_id: &str) -> Result<Vec<SharedWalletMember>>;

    fn find_member(&self, wallet_id: &str, member_id: &str)
        -> Result<Option<SharedWalletMember>>;

    /// All memberships held by one user.
    fn list_memberships(&self, member_id: &str) -> Result<Vec<SharedWalletMember>>;

    /// Writes every balance of a wallet atomically; one stale version
    /// rejects the whole batch.
    async fn update_balances(
        &self,
        wallet_id: &str,
        balances: Vec<MemberBalanceUpdate>,
    ) -> Result<Vec<SharedWalletMember>>;
}

#[async_trait]
pub trait SharedWalletServiceTrait: Send + Sync {
    async fn create_wallet(&self, new_wallet: NewSharedWallet) -> Result<SharedWalletDetails>;

    async fn rename_wallet(&self, wallet_id: &str, name: &str) -> Result<SharedWallet>;

    async fn delete_wallet(&self, wallet_id: &str) -> Result<()>;

    fn get_wallet_details(&self, wallet_id: &str) -> Result<SharedWalletDetails>;

    fn list_wallets(&self, owner_id: &str) -> Result<Vec<SharedWallet>>;

    fn list_memberships(&self, member_id: &str) -> Result<Vec<SharedWalletMember>>;

    async fn add_member(&self, new_member: NewWalletMember) -> Result<SharedWalletMember>;

    async fn update_member(
        &self,
        wallet_id: &str,
        member_id: &str,
        update: WalletMemberUpdate,
    ) -> Result<SharedWalletMember>;

    async fn remove_member(&self, wallet_id: &str, member_id: &str) -> Result<()>;

    async fn recompute_balances(&self, wallet_id: &str) -> Result<Vec<SharedWalletMember>>;

    fn ratio_integrity(&self, wallet_id: &str) -> Result<RatioIntegrity>;
}
