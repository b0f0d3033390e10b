// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the authentication database.
//!
//! Each trait covers one record type with `load` / `create` / `delete`
//! style operations and narrow, single-transaction updates. `AuthDatabase` implements all of them; the
//! services in `crate::auth` only see the traits.

use chrono::{DateTime, Utc};

use super::database::StoreResult;

pub mod accounts;
pub mod identities;
pub mod nonces;
pub mod sessions;

pub use accounts::Account;
pub use identities::{WalletIdentity, UNOWNED};
pub use nonces::{NonceDisposition, StoredNonce};
pub use sessions::StoredSession;

/// Pending sign-in nonces.
pub trait NonceRepository: Send + Sync {
    /// Store a new nonce. Fails with `UniqueViolation` if the token exists.
    fn put_nonce(&self, nonce: &StoredNonce) -> StoreResult<()>;

    fn load_nonce(&self, token: &str) -> StoreResult<Option<StoredNonce>>;

    /// Atomically read the nonce and, depending on `decide`, delete it.
    ///
    /// Returns `None` when no record exists for `token`.
    fn take_nonce_if(
        &self,
        token: &str,
        decide: &dyn Fn(&StoredNonce) -> NonceDisposition,
    ) -> StoreResult<Option<(StoredNonce, NonceDisposition)>>;

    /// Remove every nonce expired at `now`. Returns how many were removed.
    fn purge_expired_nonces(&self, now: DateTime<Utc>) -> StoreResult<usize>;
}

/// Wallet address bindings.
pub trait WalletIdentityRepository: Send + Sync {
    fn load_identity(&self, id: u64) -> StoreResult<Option<WalletIdentity>>;

    /// Look up by normalized address.
    fn load_identity_by_address(&self, wallet_address: &str) -> StoreResult<Option<WalletIdentity>>;

    /// Create the account (or reuse an orphaned one with the same username)
    /// and the binding in one transaction.
    fn create_identity_with_account(
        &self,
        wallet_address: &str,
        username: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<(WalletIdentity, Account)>;

    /// Stamp a successful login on identity `id`: set `owner_uid` and
    /// `last_used_at`, in one transaction with re-reading the row.
    ///
    /// A revoked row is returned unchanged; callers must check `active` on
    /// the returned record.
    fn record_login(
        &self,
        id: u64,
        owner_uid: u64,
        now: DateTime<Utc>,
    ) -> StoreResult<WalletIdentity>;

    /// Set only the `active` flag. Fails with `NotFound` for an unknown id.
    fn set_identity_active(&self, id: u64, active: bool) -> StoreResult<WalletIdentity>;

    fn delete_identity(&self, id: u64) -> StoreResult<bool>;
}

/// Account directory.
pub trait AccountRepository: Send + Sync {
    /// Create an account. Fails with `UniqueViolation` if the username exists.
    fn create_account(&self, username: &str, now: DateTime<Utc>) -> StoreResult<Account>;

    fn load_account(&self, uid: u64) -> StoreResult<Option<Account>>;

    fn load_account_by_username(&self, username: &str) -> StoreResult<Option<Account>>;
}

/// Login sessions.
pub trait SessionRepository: Send + Sync {
    fn put_session(&self, session: &StoredSession) -> StoreResult<()>;

    fn load_session(&self, token_digest: &str) -> StoreResult<Option<StoredSession>>;

    fn delete_session(&self, token_digest: &str) -> StoreResult<bool>;

    fn purge_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<usize>;
}
