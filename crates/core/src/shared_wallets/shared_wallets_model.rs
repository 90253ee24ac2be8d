//! Shared wallet domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::MAX_WALLET_NAME_LEN;
use crate::errors::{Error, Result};
use crate::money::round_ratio;

/// A wallet whose transactions are split between members by share ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedWallet {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Membership of a user in a shared wallet.
///
/// `running_balance` is derived: positive means the member is owed money,
/// negative means the member owes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedWalletMember {
    pub id: String,
    pub wallet_id: String,
    pub member_id: String,
    pub share_ratio: Decimal,
    pub running_balance: Decimal,
    pub is_admin: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSharedWallet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub owner_id: String,
    /// Ratio assigned to the owner's own membership; 0 when absent.
    pub owner_share_ratio: Option<Decimal>,
}

impl NewSharedWallet {
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.owner_share_ratio = Some(round_ratio(self.owner_share_ratio.unwrap_or(Decimal::ZERO)));
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_wallet_name(&self.name)?;
        if self.owner_id.trim().is_empty() {
            return Err(Error::invalid_input("Wallet owner cannot be empty"));
        }
        validate_ratio(self.owner_share_ratio.unwrap_or(Decimal::ZERO))
    }

    /// The membership row enrolling the owner as admin of `wallet_id`.
    pub fn owner_membership(&self, wallet_id: &str) -> NewWalletMember {
        NewWalletMember {
            wallet_id: wallet_id.to_string(),
            member_id: self.owner_id.clone(),
            share_ratio: self.owner_share_ratio.unwrap_or(Decimal::ZERO),
            is_admin: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWalletMember {
    pub wallet_id: String,
    pub member_id: String,
    pub share_ratio: Decimal,
    #[serde(default)]
    pub is_admin: bool,
}

impl NewWalletMember {
    pub fn validate(&self) -> Result<()> {
        if self.member_id.trim().is_empty() {
            return Err(Error::invalid_input("Member user cannot be empty"));
        }
        validate_ratio(self.share_ratio)
    }
}

/// Partial update of a membership.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletMemberUpdate {
    pub share_ratio: Option<Decimal>,
    pub is_admin: Option<bool>,
}

impl WalletMemberUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(ratio) = self.share_ratio {
            validate_ratio(ratio)?;
        }
        Ok(())
    }

    pub fn apply_to(&self, member: &SharedWalletMember) -> SharedWalletMember {
        let mut updated = member.clone();
        if let Some(ratio) = self.share_ratio {
            updated.share_ratio = round_ratio(ratio);
        }
        if let Some(is_admin) = self.is_admin {
            updated.is_admin = is_admin;
        }
        updated
    }
}

/// Versioned balance write for one member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberBalanceUpdate {
    pub member_id: String,
    pub expected_version: i64,
    pub running_balance: Decimal,
}

/// Whether a wallet's ratios add up to one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatioIntegrity {
    pub wallet_id: String,
    pub total_ratio: Decimal,
    pub is_balanced: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedWalletDetails {
    pub wallet: SharedWallet,
    pub members: Vec<SharedWalletMember>,
    pub ratio_integrity: RatioIntegrity,
}

pub(crate) fn validate_wallet_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::invalid_input("Wallet name cannot be empty"));
    }
    if name.chars().count() > MAX_WALLET_NAME_LEN {
        return Err(Error::invalid_input(format!(
            "Wallet name exceeds {} characters",
            MAX_WALLET_NAME_LEN
        )));
    }
    Ok(())
}

fn validate_ratio(ratio: Decimal) -> Result<()> {
    if ratio < Decimal::ZERO || ratio > Decimal::ONE {
        return Err(Error::invalid_input(format!(
            "Share ratio {} must be between 0 and 1",
            ratio
        )));
    }
    Ok(())
}
