// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent state of the authentication service, kept in a single embedded
//! redb database file (`{DATA_DIR}/wallet-auth.redb`).
//!
//! ## Ownership
//!
//! - Nonces are owned by the nonce store (short-lived, lazily expired)
//! - Wallet identities are owned by the identity binder
//! - Accounts and sessions belong to the account/session directory
//!
//! ## Constraints
//!
//! Uniqueness of wallet addresses and usernames is declared as index tables
//! written in the same transaction as the record they index; the storage
//! layer rejects a second record, not the application.

pub mod audit;
pub mod database;
pub mod repository;

pub use audit::{AuditEvent, AuditEventType, AuditLog};
pub use database::{AuthDatabase, StoreError, StoreResult};
pub use repository::{
    Account, AccountRepository, NonceDisposition, NonceRepository, SessionRepository,
    StoredNonce, StoredSession, WalletIdentity, WalletIdentityRepository, UNOWNED,
};
