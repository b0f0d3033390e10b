// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Single-use, time-bounded sign-in nonces.
//!
//! A nonce is issued to one wallet address and accepted at most once, for
//! that address only, until its TTL elapses. Expiry is checked lazily at
//! lookup; expired records found on the way are deleted. `purge_expired`
//! exists for the background collector and is not needed for correctness.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::storage::{NonceDisposition, NonceRepository, StoreError, StoredNonce};

use super::address::WalletAddress;
use super::clock::Clock;
use super::token::random_nonce;

/// Attempts at drawing a fresh token before giving up on collisions.
const ISSUE_ATTEMPTS: usize = 3;

/// Nonce lookup failures.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NonceError {
    #[error("nonce not found")]
    NotFound,

    #[error("nonce expired")]
    Expired,

    #[error("nonce bound to another address")]
    AddressMismatch,

    #[error("random source unavailable")]
    Entropy,

    #[error("nonce storage failure: {0}")]
    Storage(String),
}

impl From<StoreError> for NonceError {
    fn from(e: StoreError) -> Self {
        NonceError::Storage(e.to_string())
    }
}

/// A freshly issued nonce, as handed to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedNonce {
    pub token: String,
    pub wallet_address: WalletAddress,
    pub expires_at: DateTime<Utc>,
}

/// Issues and redeems nonces over a [`NonceRepository`].
#[derive(Clone)]
pub struct NonceStore {
    repo: Arc<dyn NonceRepository>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl NonceStore {
    pub fn new(repo: Arc<dyn NonceRepository>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { repo, ttl, clock }
    }

    /// Nonce lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a nonce bound to `wallet_address`.
    pub fn issue(&self, wallet_address: &WalletAddress) -> Result<IssuedNonce, NonceError> {
        let issued_at = self.clock.now();
        let expires_at = issued_at + self.ttl;

        for _ in 0..ISSUE_ATTEMPTS {
            let token = random_nonce().map_err(|_| NonceError::Entropy)?;
            let record = StoredNonce {
                token: token.clone(),
                wallet_address: wallet_address.as_str().to_string(),
                issued_at,
                expires_at,
            };
            match self.repo.put_nonce(&record) {
                Ok(()) => {
                    debug!(wallet_address = %wallet_address, %expires_at, "Issued nonce");
                    return Ok(IssuedNonce {
                        token,
                        wallet_address: wallet_address.clone(),
                        expires_at,
                    });
                }
                Err(e) if e.is_unique_violation() => {
                    warn!("Nonce token collision, drawing a new token");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(NonceError::Storage(
            "could not allocate a unique nonce token".to_string(),
        ))
    }

    /// Check a nonce without consuming it.
    ///
    /// An expired record is deleted as a side effect.
    pub fn validate(&self, token: &str, wallet_address: &WalletAddress) -> Result<(), NonceError> {
        let now = self.clock.now();
        let outcome = self.repo.take_nonce_if(token, &|nonce| {
            if nonce.is_expired(now) {
                NonceDisposition::Discard
            } else {
                NonceDisposition::Keep
            }
        })?;
        check(outcome, now, wallet_address)
    }

    /// Check a nonce and delete it if it is accepted.
    ///
    /// The lookup and the delete happen in one storage transaction, so of two
    /// concurrent callers with the same token only one can succeed; the
    /// other sees `NotFound`. A nonce presented for the wrong address is left
    /// in place.
    pub fn validate_and_consume(
        &self,
        token: &str,
        wallet_address: &WalletAddress,
    ) -> Result<(), NonceError> {
        let now = self.clock.now();
        let outcome = self.repo.take_nonce_if(token, &|nonce| {
            if nonce.is_expired(now) {
                NonceDisposition::Discard
            } else if nonce.wallet_address != wallet_address.as_str() {
                NonceDisposition::Keep
            } else {
                NonceDisposition::Consume
            }
        })?;
        check(outcome, now, wallet_address)
    }

    /// Delete every expired nonce. Returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize, NonceError> {
        Ok(self.repo.purge_expired_nonces(self.clock.now())?)
    }
}

fn check(
    outcome: Option<(StoredNonce, NonceDisposition)>,
    now: DateTime<Utc>,
    wallet_address: &WalletAddress,
) -> Result<(), NonceError> {
    let Some((nonce, _)) = outcome else {
        return Err(NonceError::NotFound);
    };
    if nonce.is_expired(now) {
        return Err(NonceError::Expired);
    }
    if nonce.wallet_address != wallet_address.as_str() {
        return Err(NonceError::AddressMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use crate::storage::AuthDatabase;

    const ADDR_A: &str = "0x71C7656EC7ab88b098defB751B7401B5f6d8976F";
    const ADDR_B: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn store(ttl_secs: i64) -> (NonceStore, Arc<ManualClock>, Arc<AuthDatabase>) {
        let db = Arc::new(AuthDatabase::in_memory().unwrap());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = NonceStore::new(db.clone(), Duration::seconds(ttl_secs), clock.clone());
        (store, clock, db)
    }

    fn addr(raw: &str) -> WalletAddress {
        WalletAddress::parse(raw).unwrap()
    }

    #[test]
    fn issue_then_consume_succeeds_exactly_once() {
        let (store, _, _) = store(300);
        let a = addr(ADDR_A);
        let issued = store.issue(&a).unwrap();

        assert_eq!(store.validate_and_consume(&issued.token, &a), Ok(()));
        assert_eq!(
            store.validate_and_consume(&issued.token, &a),
            Err(NonceError::NotFound)
        );
    }

    #[test]
    fn issued_nonce_is_bound_to_normalized_address() {
        let (store, clock, db) = store(300);
        let issued = store.issue(&addr(ADDR_A)).unwrap();

        let record = db.load_nonce(&issued.token).unwrap().unwrap();
        assert_eq!(record.wallet_address, ADDR_A.to_ascii_lowercase());
        assert_eq!(record.issued_at, clock.now());
        assert_eq!(issued.expires_at, clock.now() + Duration::seconds(300));
    }

    #[test]
    fn nonce_expires_after_ttl() {
        let (store, clock, db) = store(60);
        let a = addr(ADDR_A);
        let issued = store.issue(&a).unwrap();

        clock.advance(Duration::seconds(61));
        assert_eq!(
            store.validate_and_consume(&issued.token, &a),
            Err(NonceError::Expired)
        );
        // Lazily removed on lookup.
        assert!(db.load_nonce(&issued.token).unwrap().is_none());
    }

    #[test]
    fn nonce_is_still_valid_just_before_ttl() {
        let (store, clock, _) = store(60);
        let a = addr(ADDR_A);
        let issued = store.issue(&a).unwrap();

        clock.advance(Duration::seconds(59));
        assert_eq!(store.validate_and_consume(&issued.token, &a), Ok(()));
    }

    #[test]
    fn address_mismatch_does_not_burn_the_nonce() {
        let (store, _, _) = store(300);
        let a = addr(ADDR_A);
        let b = addr(ADDR_B);
        let issued = store.issue(&a).unwrap();

        assert_eq!(
            store.validate_and_consume(&issued.token, &b),
            Err(NonceError::AddressMismatch)
        );
        assert_eq!(store.validate_and_consume(&issued.token, &a), Ok(()));
    }

    #[test]
    fn validate_does_not_consume() {
        let (store, _, _) = store(300);
        let a = addr(ADDR_A);
        let issued = store.issue(&a).unwrap();

        assert_eq!(store.validate(&issued.token, &a), Ok(()));
        assert_eq!(store.validate(&issued.token, &a), Ok(()));
        assert_eq!(
            store.validate(&issued.token, &addr(ADDR_B)),
            Err(NonceError::AddressMismatch)
        );
        assert_eq!(store.validate_and_consume(&issued.token, &a), Ok(()));
        assert_eq!(store.validate(&issued.token, &a), Err(NonceError::NotFound));
    }

    #[test]
    fn unknown_token_is_not_found() {
        let (store, _, _) = store(300);
        assert_eq!(
            store.validate_and_consume("never-issued", &addr(ADDR_A)),
            Err(NonceError::NotFound)
        );
    }

    #[test]
    fn purge_removes_expired_only() {
        let (store, clock, _) = store(60);
        let a = addr(ADDR_A);
        store.issue(&a).unwrap();
        store.issue(&a).unwrap();
        clock.advance(Duration::seconds(30));
        let fresh = store.issue(&a).unwrap();
        clock.advance(Duration::seconds(31));

        assert_eq!(store.purge_expired().unwrap(), 2);
        assert_eq!(store.validate(&fresh.token, &a), Ok(()));
    }

    #[test]
    fn concurrent_consumers_only_one_wins() {
        let (store, _, _) = store(300);
        let a = addr(ADDR_A);
        let issued = store.issue(&a).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let a = a.clone();
                let token = issued.token.clone();
                std::thread::spawn(move || store.validate_and_consume(&token, &a))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter(|r| r.is_err())
            .all(|r| *r == Err(NonceError::NotFound)));
    }
}
