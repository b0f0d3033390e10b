// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet identity repository.
//!
//! ## Storage Layout
//!
//! ```text
//! wallet_identities     id -> WalletIdentity (JSON)
//! wallet_address_index  normalized address -> id   (UNIQUE)
//! ```
//!
//! ## Uniqueness
//!
//! The address index is written in the same transaction as the record. A
//! prior value in the index aborts the transaction with
//! `StoreError::UniqueViolation`, so two writers racing on the same new
//! address cannot both commit.
//!
//! ## Updates
//!
//! Stored records are never written back whole. Each update re-reads the
//! row inside its own write transaction and changes only the fields it
//! owns: a login stamps `owner_uid` and `last_used_at`, an administrator
//! flips `active`.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable, WriteTransaction};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::database::{
    next_id, AuthDatabase, StoreError, StoreResult, WALLET_ADDRESS_INDEX, WALLET_IDENTITIES,
};
use super::accounts::{find_account_by_username, insert_account, Account};
use super::WalletIdentityRepository;

const IDENTITY_SEQUENCE: &str = "wallet_identities";

/// Owner id meaning "not bound to any account".
pub const UNOWNED: u64 = 0;

/// Durable binding of a wallet address to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WalletIdentity {
    /// Record id
    pub id: u64,
    /// Normalized (lowercase) wallet address, unique across all records
    pub wallet_address: String,
    /// Owning account uid, `0` when unowned
    pub owner_uid: u64,
    /// Inactive wallets are revoked and cannot log in
    pub active: bool,
    /// When the binding was created
    pub created_at: DateTime<Utc>,
    /// Last successful authentication
    pub last_used_at: DateTime<Utc>,
}

impl WalletIdentity {
    /// Whether the identity points at an account.
    pub fn is_owned(&self) -> bool {
        self.owner_uid != UNOWNED
    }
}

fn insert_identity(
    txn: &WriteTransaction,
    wallet_address: &str,
    owner_uid: u64,
    now: DateTime<Utc>,
) -> StoreResult<WalletIdentity> {
    let id = next_id(txn, IDENTITY_SEQUENCE)?;

    {
        let mut index = txn.open_table(WALLET_ADDRESS_INDEX)?;
        let taken = index.insert(wallet_address, id)?.is_some();
        if taken {
            return Err(StoreError::UniqueViolation {
                index: "wallet_address_index",
                key: wallet_address.to_string(),
            });
        }
    }

    let identity = WalletIdentity {
        id,
        wallet_address: wallet_address.to_string(),
        owner_uid,
        active: true,
        created_at: now,
        last_used_at: now,
    };
    let json = serde_json::to_vec(&identity)?;
    let mut table = txn.open_table(WALLET_IDENTITIES)?;
    table.insert(id, json.as_slice())?;

    Ok(identity)
}

/// Run `write` in a write transaction, aborting it when `write` fails.
fn in_write_txn<T>(
    db: &AuthDatabase,
    write: impl FnOnce(&WriteTransaction) -> StoreResult<T>,
) -> StoreResult<T> {
    let write_txn = db.db.begin_write()?;
    match write(&write_txn) {
        Ok(value) => {
            write_txn.commit()?;
            Ok(value)
        }
        Err(e) => {
            write_txn.abort()?;
            Err(e)
        }
    }
}

/// Re-read identity `id` and apply `change` to it in the same transaction.
///
/// `change` returns whether the row must be written back. The stored row,
/// after the change, is returned.
fn update_identity(
    txn: &WriteTransaction,
    id: u64,
    change: impl FnOnce(&mut WalletIdentity) -> bool,
) -> StoreResult<WalletIdentity> {
    let mut table = txn.open_table(WALLET_IDENTITIES)?;
    let mut identity: WalletIdentity = match table.get(id)? {
        Some(value) => serde_json::from_slice(value.value())?,
        None => return Err(StoreError::NotFound(format!("Wallet identity {id}"))),
    };
    if change(&mut identity) {
        let json = serde_json::to_vec(&identity)?;
        table.insert(id, json.as_slice())?;
    }
    Ok(identity)
}

impl WalletIdentityRepository for AuthDatabase {
    fn load_identity(&self, id: u64) -> StoreResult<Option<WalletIdentity>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WALLET_IDENTITIES)?;
        let identity = match table.get(id)? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };
        Ok(identity)
    }

    fn load_identity_by_address(&self, wallet_address: &str) -> StoreResult<Option<WalletIdentity>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(WALLET_ADDRESS_INDEX)?;
        let id = index.get(wallet_address)?.map(|v| v.value());
        match id {
            Some(id) => self.load_identity(id),
            None => Ok(None),
        }
    }

    fn create_identity_with_account(
        &self,
        wallet_address: &str,
        username: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<(WalletIdentity, Account)> {
        in_write_txn(self, |txn| {
            // An account may survive its binding being deleted; re-bind to it.
            let account = match find_account_by_username(txn, username)? {
                Some(existing) => existing,
                None => insert_account(txn, username, now)?,
            };
            let identity = insert_identity(txn, wallet_address, account.uid, now)?;
            Ok((identity, account))
        })
    }

    fn record_login(
        &self,
        id: u64,
        owner_uid: u64,
        now: DateTime<Utc>,
    ) -> StoreResult<WalletIdentity> {
        in_write_txn(self, |txn| {
            update_identity(txn, id, |identity| {
                if !identity.active {
                    return false;
                }
                identity.owner_uid = owner_uid;
                identity.last_used_at = now;
                true
            })
        })
    }

    fn set_identity_active(&self, id: u64, active: bool) -> StoreResult<WalletIdentity> {
        in_write_txn(self, |txn| {
            update_identity(txn, id, |identity| {
                let changed = identity.active != active;
                identity.active = active;
                changed
            })
        })
    }

    fn delete_identity(&self, id: u64) -> StoreResult<bool> {
        in_write_txn(self, |txn| {
            let mut table = txn.open_table(WALLET_IDENTITIES)?;
            let removed: Option<WalletIdentity> = match table.remove(id)? {
                Some(value) => Some(serde_json::from_slice(value.value())?),
                None => None,
            };
            let Some(identity) = removed else {
                return Ok(false);
            };
            let mut index = txn.open_table(WALLET_ADDRESS_INDEX)?;
            index.remove(identity.wallet_address.as_str())?;
            Ok(true)
        })
    }
}

#[cfg(test)]
impl AuthDatabase {
    /// Insert a binding with an arbitrary owner, outside the login path.
    pub(crate) fn seed_identity(
        &self,
        wallet_address: &str,
        owner_uid: u64,
        now: DateTime<Utc>,
    ) -> StoreResult<WalletIdentity> {
        in_write_txn(self, |txn| insert_identity(txn, wallet_address, owner_uid, now))
    }
}
