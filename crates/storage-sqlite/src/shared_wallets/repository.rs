use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;

use fintrack_core::errors::{Error, Result};
use fintrack_core::shared_wallets::{
    MemberBalanceUpdate, NewSharedWallet, NewWalletMember, SharedWallet, SharedWalletMember,
    SharedWalletRepositoryTrait,
};

use super::model::{SharedWalletDB, SharedWalletMemberDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{duplicate_or_storage, StorageError};
use crate::schema::{shared_wallet_members, shared_wallets, transactions};
use crate::utils::format_instant;

pub struct SharedWalletRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SharedWalletRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

fn load_member(
    conn: &mut SqliteConnection,
    wallet_id: &str,
    member_id: &str,
) -> Result<Option<SharedWalletMember>> {
    let row = shared_wallet_members::table
        .filter(shared_wallet_members::wallet_id.eq(wallet_id))
        .filter(shared_wallet_members::member_id.eq(member_id))
        .select(SharedWalletMemberDB::as_select())
        .first::<SharedWalletMemberDB>(conn)
        .optional()
        .map_err(StorageError::from)?;
    Ok(row.map(SharedWalletMember::try_from).transpose()?)
}

fn load_members<F>(conn: &mut SqliteConnection, build: F) -> Result<Vec<SharedWalletMember>>
where
    F: FnOnce(
        shared_wallet_members::BoxedQuery<'static, diesel::sqlite::Sqlite>,
    ) -> shared_wallet_members::BoxedQuery<'static, diesel::sqlite::Sqlite>,
{
    let rows = build(shared_wallet_members::table.into_boxed())
        .order((
            shared_wallet_members::created_at.asc(),
            shared_wallet_members::member_id.asc(),
        ))
        .select(SharedWalletMemberDB::as_select())
        .load::<SharedWalletMemberDB>(conn)
        .map_err(StorageError::from)?;
    rows.into_iter()
        .map(|row| SharedWalletMember::try_from(row).map_err(Error::from))
        .collect()
}

/// Explains why a versioned member write touched no row.
fn missed_member_update(conn: &mut SqliteConnection, wallet_id: &str, member_id: &str) -> Error {
    match load_member(conn, wallet_id, member_id) {
        Ok(Some(_)) => Error::ConcurrencyConflict(format!(
            "Member '{}' of wallet '{}' was modified concurrently",
            member_id, wallet_id
        )),
        Ok(None) => Error::not_found("Wallet member", member_id),
        Err(e) => e,
    }
}

#[async_trait]
impl SharedWalletRepositoryTrait for SharedWalletRepository {
    /// Creates the wallet and enrolls its owner in the same transaction.
    async fn create_wallet(
        &self,
        new_wallet: NewSharedWallet,
    ) -> Result<(SharedWallet, SharedWalletMember)> {
        let now = Utc::now();
        let wallet_row = SharedWalletDB::from_new(&new_wallet, now);
        let owner_row =
            SharedWalletMemberDB::from_new(new_wallet.owner_membership(&wallet_row.id), now);

        self.writer
            .exec(move |conn| -> Result<(SharedWallet, SharedWalletMember)> {
                let wallet = diesel::insert_into(shared_wallets::table)
                    .values(&wallet_row)
                    .returning(SharedWalletDB::as_returning())
                    .get_result(conn)
                    .map_err(|e| {
                        duplicate_or_storage(e, || format!("wallet name '{}'", wallet_row.name))
                    })?;
                let owner = diesel::insert_into(shared_wallet_members::table)
                    .values(&owner_row)
                    .returning(SharedWalletMemberDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Ok((
                    SharedWallet::try_from(wallet)?,
                    SharedWalletMember::try_from(owner)?,
                ))
            })
            .await
    }

    async fn rename_wallet(&self, wallet_id: &str, name: &str) -> Result<SharedWallet> {
        let wallet_id = wallet_id.to_string();
        let name = name.to_string();
        self.writer
            .exec(move |conn| -> Result<SharedWallet> {
                let updated = diesel::update(shared_wallets::table.find(&wallet_id))
                    .set((
                        shared_wallets::name.eq(&name),
                        shared_wallets::updated_at.eq(format_instant(Utc::now())),
                    ))
                    .returning(SharedWalletDB::as_returning())
                    .get_result(conn)
                    .optional()
                    .map_err(|e| duplicate_or_storage(e, || format!("wallet name '{}'", name)))?
                    .ok_or_else(|| Error::not_found("Shared wallet", &wallet_id))?;
                Ok(SharedWallet::try_from(updated)?)
            })
            .await
    }

    /// Removes the wallet and its members and detaches its transactions,
    /// all or nothing.
    async fn delete_wallet(&self, wallet_id: &str) -> Result<usize> {
        let wallet_id = wallet_id.to_string();
        self.writer
            .exec(move |conn| -> Result<usize> {
                diesel::update(
                    transactions::table.filter(transactions::shared_wallet_id.eq(&wallet_id)),
                )
                .set((
                    transactions::shared_wallet_id.eq(None::<String>),
                    transactions::updated_at.eq(format_instant(Utc::now())),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;
                diesel::delete(
                    shared_wallet_members::table
                        .filter(shared_wallet_members::wallet_id.eq(&wallet_id)),
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(diesel::delete(shared_wallets::table.find(&wallet_id))
                    .execute(conn)
                    .map_err(StorageError::from)?)
            })
            .await
    }

    fn get_wallet(&self, wallet_id: &str) -> Result<SharedWallet> {
        let mut conn = get_connection(&self.pool)?;
        let row = shared_wallets::table
            .find(wallet_id)
            .select(SharedWalletDB::as_select())
            .first::<SharedWalletDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .ok_or_else(|| Error::not_found("Shared wallet", wallet_id))?;
        Ok(SharedWallet::try_from(row)?)
    }

    fn list_wallets_by_owner(&self, owner_id: &str) -> Result<Vec<SharedWallet>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = shared_wallets::table
            .filter(shared_wallets::owner_id.eq(owner_id))
            .order(shared_wallets::created_at.asc())
            .select(SharedWalletDB::as_select())
            .load::<SharedWalletDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(|row| SharedWallet::try_from(row).map_err(Error::from))
            .collect()
    }

    /// Wallet names are unique per owner regardless of case.
    fn exists_by_owner_and_name(&self, owner_id: &str, name: &str) -> Result<bool> {
        let mut conn = get_connection(&self.pool)?;
        let names = shared_wallets::table
            .filter(shared_wallets::owner_id.eq(owner_id))
            .select(shared_wallets::name)
            .load::<String>(&mut conn)
            .map_err(StorageError::from)?;
        let wanted = name.to_lowercase();
        Ok(names.iter().any(|n| n.to_lowercase() == wanted))
    }

    async fn add_member(&self, new_member: NewWalletMember) -> Result<SharedWalletMember> {
        let row = SharedWalletMemberDB::from_new(new_member, Utc::now());
        self.writer
            .exec(move |conn| -> Result<SharedWalletMember> {
                let inserted = diesel::insert_into(shared_wallet_members::table)
                    .values(&row)
                    .returning(SharedWalletMemberDB::as_returning())
                    .get_result(conn)
                    .map_err(|e| {
                        duplicate_or_storage(e, || {
                            format!("member '{}' of wallet '{}'", row.member_id, row.wallet_id)
                        })
                    })?;
                Ok(SharedWalletMember::try_from(inserted)?)
            })
            .await
    }

    async fn update_member(&self, member: SharedWalletMember) -> Result<SharedWalletMember> {
        self.writer
            .exec(move |conn| -> Result<SharedWalletMember> {
                let updated = diesel::update(
                    shared_wallet_members::table
                        .filter(shared_wallet_members::wallet_id.eq(&member.wallet_id))
                        .filter(shared_wallet_members::member_id.eq(&member.member_id))
                        .filter(shared_wallet_members::version.eq(member.version)),
                )
                .set((
                    shared_wallet_members::share_ratio.eq(member.share_ratio.to_string()),
                    shared_wallet_members::is_admin.eq(member.is_admin),
                    shared_wallet_members::version.eq(shared_wallet_members::version + 1),
                    shared_wallet_members::updated_at.eq(format_instant(Utc::now())),
                ))
                .returning(SharedWalletMemberDB::as_returning())
                .get_result(conn)
                .optional()
                .map_err(StorageError::from)?;
                match updated {
                    Some(row) => Ok(SharedWalletMember::try_from(row)?),
                    None => Err(missed_member_update(conn, &member.wallet_id, &member.member_id)),
                }
            })
            .await
    }

    async fn remove_member(&self, wallet_id: &str, member_id: &str) -> Result<usize> {
        let wallet_id = wallet_id.to_string();
        let member_id = member_id.to_string();
        self.writer
            .exec(move |conn| -> Result<usize> {
                Ok(diesel::delete(
                    shared_wallet_members::table
                        .filter(shared_wallet_members::wallet_id.eq(wallet_id))
                        .filter(shared_wallet_members::member_id.eq(member_id)),
                )
                .execute(conn)
                .map_err(StorageError::from)?)
            })
            .await
    }

    fn list_members(&self, wallet_id: &str) -> Result<Vec<SharedWalletMember>> {
        let mut conn = get_connection(&self.pool)?;
        let wallet_id = wallet_id.to_string();
        load_members(&mut conn, |q| {
            q.filter(shared_wallet_members::wallet_id.eq(wallet_id))
        })
    }

    fn find_member(
        &self,
        wallet_id: &str,
        member_id: &str,
    ) -> Result<Option<SharedWalletMember>> {
        let mut conn = get_connection(&self.pool)?;
        load_member(&mut conn, wallet_id, member_id)
    }

    fn list_memberships(&self, member_id: &str) -> Result<Vec<SharedWalletMember>> {
        let mut conn = get_connection(&self.pool)?;
        let member_id = member_id.to_string();
        load_members(&mut conn, |q| {
            q.filter(shared_wallet_members::member_id.eq(member_id))
        })
    }

    /// Writes every balance or none. Any version mismatch aborts the batch
    /// with a conflict.
    async fn update_balances(
        &self,
        wallet_id: &str,
        balances: Vec<MemberBalanceUpdate>,
    ) -> Result<Vec<SharedWalletMember>> {
        let wallet_id = wallet_id.to_string();
        self.writer
            .exec(move |conn| -> Result<Vec<SharedWalletMember>> {
                let now = format_instant(Utc::now());
                let mut written = Vec::with_capacity(balances.len());
                for update in balances {
                    let row = diesel::update(
                        shared_wallet_members::table
                            .filter(shared_wallet_members::wallet_id.eq(&wallet_id))
                            .filter(shared_wallet_members::member_id.eq(&update.member_id))
                            .filter(shared_wallet_members::version.eq(update.expected_version)),
                    )
                    .set((
                        shared_wallet_members::running_balance
                            .eq(update.running_balance.to_string()),
                        shared_wallet_members::version.eq(shared_wallet_members::version + 1),
                        shared_wallet_members::updated_at.eq(&now),
                    ))
                    .returning(SharedWalletMemberDB::as_returning())
                    .get_result(conn)
                    .optional()
                    .map_err(StorageError::from)?;
                    match row {
                        Some(row) => written.push(SharedWalletMember::try_from(row)?),
                        None => {
                            return Err(missed_member_update(conn, &wallet_id, &update.member_id))
                        }
                    }
                }
                Ok(written)
            })
            .await
    }
}
