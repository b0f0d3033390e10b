// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account directory.
//!
//! Accounts are the site users wallet identities log in as. Usernames are
//! unique through the `account_username_index` table.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable, WriteTransaction};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::database::{
    next_id, AuthDatabase, StoreError, StoreResult, ACCOUNTS, ACCOUNT_USERNAME_INDEX,
};
use super::AccountRepository;

const ACCOUNT_SEQUENCE: &str = "accounts";

/// A site account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Account {
    /// Numeric account id (never 0)
    pub uid: u64,
    /// Unique login name
    pub username: String,
    /// When the account was created
    pub created_at: DateTime<Utc>,
}

/// Insert a new account inside an open write transaction.
///
/// Fails with `UniqueViolation` when the username is taken.
pub(crate) fn insert_account(
    txn: &WriteTransaction,
    username: &str,
    now: DateTime<Utc>,
) -> StoreResult<Account> {
    let uid = next_id(txn, ACCOUNT_SEQUENCE)?;

    {
        let mut index = txn.open_table(ACCOUNT_USERNAME_INDEX)?;
        let taken = index.insert(username, uid)?.is_some();
        if taken {
            return Err(StoreError::UniqueViolation {
                index: "account_username_index",
                key: username.to_string(),
            });
        }
    }

    let account = Account {
        uid,
        username: username.to_string(),
        created_at: now,
    };
    let json = serde_json::to_vec(&account)?;
    let mut table = txn.open_table(ACCOUNTS)?;
    table.insert(uid, json.as_slice())?;

    Ok(account)
}

/// Look up an account by username inside an open write transaction.
pub(crate) fn find_account_by_username(
    txn: &WriteTransaction,
    username: &str,
) -> StoreResult<Option<Account>> {
    let uid = {
        let index = txn.open_table(ACCOUNT_USERNAME_INDEX)?;
        let uid = index.get(username)?.map(|v| v.value());
        uid
    };
    let Some(uid) = uid else {
        return Ok(None);
    };

    let table = txn.open_table(ACCOUNTS)?;
    let account = match table.get(uid)? {
        Some(value) => Some(serde_json::from_slice(value.value())?),
        None => None,
    };
    Ok(account)
}

impl AccountRepository for AuthDatabase {
    fn create_account(&self, username: &str, now: DateTime<Utc>) -> StoreResult<Account> {
        let write_txn = self.db.begin_write()?;
        let account = match insert_account(&write_txn, username, now) {
            Ok(account) => account,
            Err(e) => {
                write_txn.abort()?;
                return Err(e);
            }
        };
        write_txn.commit()?;
        Ok(account)
    }

    fn load_account(&self, uid: u64) -> StoreResult<Option<Account>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCOUNTS)?;
        let account = match table.get(uid)? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };
        Ok(account)
    }

    fn load_account_by_username(&self, username: &str) -> StoreResult<Option<Account>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(ACCOUNT_USERNAME_INDEX)?;
        let uid = index.get(username)?.map(|v| v.value());
        match uid {
            Some(uid) => self.load_account(uid),
            None => Ok(None),
        }
    }
}
