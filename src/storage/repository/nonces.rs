// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Nonce records in the short-lived `nonces` table.
//!
//! A nonce is a pending sign-in challenge: an opaque token bound to the
//! wallet address that requested it, valid until `expires_at`.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};

use super::super::database::{AuthDatabase, StoreError, StoreResult, NONCES};
use super::NonceRepository;

/// A pending nonce as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredNonce {
    /// Opaque random token handed to the client
    pub token: String,
    /// Normalized wallet address the nonce was issued to
    pub wallet_address: String,
    /// When the nonce was issued
    pub issued_at: DateTime<Utc>,
    /// When the nonce stops being accepted
    pub expires_at: DateTime<Utc>,
}

impl StoredNonce {
    /// A nonce is expired from `expires_at` onwards.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// What `take_if` should do with the record it found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceDisposition {
    /// Delete the record; the caller accepted it.
    Consume,
    /// Delete the record; the caller rejected it (e.g. expired).
    Discard,
    /// Leave the record in place.
    Keep,
}

impl NonceRepository for AuthDatabase {
    fn put_nonce(&self, nonce: &StoredNonce) -> StoreResult<()> {
        let json = serde_json::to_vec(nonce)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(NONCES)?;
            let previous = table.insert(nonce.token.as_str(), json.as_slice())?.is_some();
            if previous {
                drop(table);
                write_txn.abort()?;
                return Err(StoreError::UniqueViolation {
                    index: "nonces",
                    key: nonce.token.clone(),
                });
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn load_nonce(&self, token: &str) -> StoreResult<Option<StoredNonce>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(NONCES)?;
        let nonce = match table.get(token)? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };
        Ok(nonce)
    }

    fn take_nonce_if(
        &self,
        token: &str,
        decide: &dyn Fn(&StoredNonce) -> NonceDisposition,
    ) -> StoreResult<Option<(StoredNonce, NonceDisposition)>> {
        let write_txn = self.db.begin_write()?;
        let outcome = {
            let mut table = write_txn.open_table(NONCES)?;
            let stored: Option<StoredNonce> = match table.get(token)? {
                Some(value) => Some(serde_json::from_slice(value.value())?),
                None => None,
            };

            match stored {
                Some(nonce) => {
                    let disposition = decide(&nonce);
                    if disposition != NonceDisposition::Keep {
                        table.remove(token)?;
                    }
                    Some((nonce, disposition))
                }
                None => None,
            }
        };
        write_txn.commit()?;
        Ok(outcome)
    }

    fn purge_expired_nonces(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let write_txn = self.db.begin_write()?;
        let purged = {
            let mut table = write_txn.open_table(NONCES)?;

            let mut expired = Vec::new();
            for entry in table.iter()? {
                let (key, value) = entry?;
                let nonce: StoredNonce = serde_json::from_slice(value.value())?;
                if nonce.is_expired(now) {
                    expired.push(key.value().to_string());
                }
            }

            for token in &expired {
                table.remove(token.as_str())?;
            }
            expired.len()
        };
        write_txn.commit()?;
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    fn temp_db() -> (AuthDatabase, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = AuthDatabase::open(&dir.path().join("test.redb")).unwrap();
        (db, dir)
    }

    fn sample_nonce(token: &str, ttl_secs: i64) -> StoredNonce {
        let issued_at = Utc::now();
        StoredNonce {
            token: token.to_string(),
            wallet_address: "0x71c7656ec7ab88b098defb751b7401b5f6d8976f".to_string(),
            issued_at,
            expires_at: issued_at + Duration::seconds(ttl_secs),
        }
    }

    #[test]
    fn put_and_load_nonce() {
        let (db, _dir) = temp_db();
        let nonce = sample_nonce("tok-1", 300);
        db.put_nonce(&nonce).unwrap();

        assert_eq!(db.load_nonce("tok-1").unwrap(), Some(nonce));
        assert_eq!(db.load_nonce("missing").unwrap(), None);
    }

    #[test]
    fn put_rejects_duplicate_token_and_keeps_original() {
        let (db, _dir) = temp_db();
        let original = sample_nonce("tok-dup", 300);
        db.put_nonce(&original).unwrap();

        let mut other = sample_nonce("tok-dup", 300);
        other.wallet_address = "0x0000000000000000000000000000000000000001".to_string();
        let err = db.put_nonce(&other).unwrap_err();
        assert!(err.is_unique_violation());

        let loaded = db.load_nonce("tok-dup").unwrap().unwrap();
        assert_eq!(loaded.wallet_address, original.wallet_address);
    }

    #[test]
    fn take_if_respects_disposition() {
        let (db, _dir) = temp_db();
        db.put_nonce(&sample_nonce("keep", 300)).unwrap();
        db.put_nonce(&sample_nonce("consume", 300)).unwrap();

        let kept = db.take_nonce_if("keep", &|_| NonceDisposition::Keep).unwrap();
        assert_eq!(kept.unwrap().1, NonceDisposition::Keep);
        assert!(db.load_nonce("keep").unwrap().is_some());

        let consumed = db
            .take_nonce_if("consume", &|_| NonceDisposition::Consume)
            .unwrap();
        assert_eq!(consumed.unwrap().1, NonceDisposition::Consume);
        assert!(db.load_nonce("consume").unwrap().is_none());

        assert!(db
            .take_nonce_if("consume", &|_| NonceDisposition::Consume)
            .unwrap()
            .is_none());
    }

    #[test]
    fn concurrent_consumers_only_one_wins() {
        let (db, _dir) = temp_db();
        let db = Arc::new(db);
        db.put_nonce(&sample_nonce("race", 300)).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = Arc::clone(&db);
                std::thread::spawn(move || {
                    db.take_nonce_if("race", &|_| NonceDisposition::Consume)
                        .unwrap()
                        .is_some()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn purge_removes_only_expired() {
        let (db, _dir) = temp_db();
        db.put_nonce(&sample_nonce("old-1", -10)).unwrap();
        db.put_nonce(&sample_nonce("old-2", 0)).unwrap();
        db.put_nonce(&sample_nonce("fresh", 300)).unwrap();

        let purged = db.purge_expired_nonces(Utc::now()).unwrap();
        assert_eq!(purged, 2);
        assert!(db.load_nonce("fresh").unwrap().is_some());
        assert!(db.load_nonce("old-1").unwrap().is_none());
    }
}
