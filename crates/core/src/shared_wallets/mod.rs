//! Shared wallets module - ratio-split wallets and member settlement.

mod settlement;
mod shared_wallets_model;
mod shared_wallets_service;
mod shared_wallets_traits;


pub use settlement::{compute_balances, ratio_integrity, validate_ratios, SettlementEngine};
pub use shared_wallets_model::{
    MemberBalanceUpdate, NewSharedWallet, NewWalletMember, RatioIntegrity, SharedWallet,
    SharedWalletDetails, SharedWalletMember, WalletMemberUpdate,
};
pub use shared_wallets_service::SharedWalletService;
pub use shared_wallets_traits::{SharedWalletRepositoryTrait, SharedWalletServiceTrait};
