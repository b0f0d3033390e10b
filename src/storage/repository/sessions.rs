// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login sessions keyed by the SHA-256 digest of the session token.
//!
//! The raw token only ever lives in the client's cookie.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};

use super::super::database::{AuthDatabase, StoreResult, SESSIONS};
use super::SessionRepository;

/// A persisted login session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    /// Hex SHA-256 of the session token
    pub token_digest: String,
    /// Logged-in account
    pub uid: u64,
    /// Normalized address of the wallet the session was opened with
    #[serde(default)]
    pub wallet_address: String,
    /// When the session was established
    pub created_at: DateTime<Utc>,
    /// When the session stops being honored
    pub expires_at: DateTime<Utc>,
}

impl StoredSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl SessionRepository for AuthDatabase {
    fn put_session(&self, session: &StoredSession) -> StoreResult<()> {
        let json = serde_json::to_vec(session)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SESSIONS)?;
            table.insert(session.token_digest.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn load_session(&self, token_digest: &str) -> StoreResult<Option<StoredSession>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSIONS)?;
        let session = match table.get(token_digest)? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };
        Ok(session)
    }

    fn delete_session(&self, token_digest: &str) -> StoreResult<bool> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(SESSIONS)?;
            let removed = table.remove(token_digest)?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    fn purge_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let write_txn = self.db.begin_write()?;
        let purged = {
            let mut table = write_txn.open_table(SESSIONS)?;

            let mut expired = Vec::new();
            for entry in table.iter()? {
                let (key, value) = entry?;
                let session: StoredSession = serde_json::from_slice(value.value())?;
                if session.is_expired(now) {
                    expired.push(key.value().to_string());
                }
            }

            for digest in &expired {
                table.remove(digest.as_str())?;
            }
            expired.len()
        };
        write_txn.commit()?;
        Ok(purged)
    }
}
