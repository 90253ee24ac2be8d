//! Database models for shared wallets.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use fintrack_core::shared_wallets::{
    NewSharedWallet, NewWalletMember, SharedWallet, SharedWalletMember,
};

use crate::errors::StorageError;
use crate::utils::{format_instant, parse_decimal, parse_timestamp};

#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::shared_wallets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SharedWalletDB {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl SharedWalletDB {
    pub fn from_new(new_wallet: &NewSharedWallet, now: DateTime<Utc>) -> Self {
        let stamp = format_instant(now);
        Self {
            id: new_wallet
                .id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: new_wallet.name.clone(),
            owner_id: new_wallet.owner_id.clone(),
            created_at: stamp.clone(),
            updated_at: stamp,
        }
    }
}

impl TryFrom<SharedWalletDB> for SharedWallet {
    type Error = StorageError;

    fn try_from(db: SharedWalletDB) -> Result<Self, Self::Error> {
        Ok(Self {
            created_at: parse_timestamp(&db.created_at, "shared_wallets.created_at")?,
            updated_at: parse_timestamp(&db.updated_at, "shared_wallets.updated_at")?,
            id: db.id,
            name: db.name,
            owner_id: db.owner_id,
        })
    }
}

#[derive(
    Queryable, Identifiable, Insertable, Associations, Selectable, PartialEq, Debug, Clone,
)]
#[diesel(belongs_to(SharedWalletDB, foreign_key = wallet_id))]
#[diesel(table_name = crate::schema::shared_wallet_members)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SharedWalletMemberDB {
    pub id: String,
    pub wallet_id: String,
    pub member_id: String,
    pub share_ratio: String,
    pub running_balance: String,
    pub is_admin: bool,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl SharedWalletMemberDB {
    pub fn from_new(new_member: NewWalletMember, now: DateTime<Utc>) -> Self {
        let stamp = format_instant(now);
        Self {
            id: Uuid::new_v4().to_string(),
            wallet_id: new_member.wallet_id,
            member_id: new_member.member_id,
            share_ratio: new_member.share_ratio.to_string(),
            running_balance: Decimal::ZERO.to_string(),
            is_admin: new_member.is_admin,
            version: 1,
            created_at: stamp.clone(),
            updated_at: stamp,
        }
    }
}

impl TryFrom<SharedWalletMemberDB> for SharedWalletMember {
    type Error = StorageError;

    fn try_from(db: SharedWalletMemberDB) -> Result<Self, Self::Error> {
        Ok(Self {
            share_ratio: parse_decimal(&db.share_ratio, "shared_wallet_members.share_ratio")?,
            running_balance: parse_decimal(
                &db.running_balance,
                "shared_wallet_members.running_balance",
            )?,
            created_at: parse_timestamp(&db.created_at, "shared_wallet_members.created_at")?,
            updated_at: parse_timestamp(&db.updated_at, "shared_wallet_members.updated_at")?,
            id: db.id,
            wallet_id: db.wallet_id,
            member_id: db.member_id,
            is_admin: db.is_admin,
            version: db.version,
        })
    }
}
