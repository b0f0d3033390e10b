// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded authentication database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `nonces`: token → serialized StoredNonce
//! - `wallet_identities`: identity id → serialized WalletIdentity
//! - `wallet_address_index`: normalized address → identity id (UNIQUE)
//! - `accounts`: uid → serialized Account
//! - `account_username_index`: username → uid (UNIQUE)
//! - `sessions`: sha256(session token) → serialized StoredSession
//! - `sequences`: sequence name → last allocated id
//! - `audit_events`: (timestamp_be | event uuid) → serialized AuditEvent
//!
//! redb serializes write transactions, so every "read, decide, write" step
//! done inside one `begin_write()` is atomic with respect to other writers.
//! Unique indexes are enforced by inserting into the index table inside the
//! same transaction that creates the record and aborting on a prior value.

use std::path::Path;

use redb::{
    backends::InMemoryBackend, Database, ReadableDatabase, ReadableTable, TableDefinition,
    WriteTransaction,
};

// =============================================================================
// Table Definitions
// =============================================================================

/// Pending nonces: token → serialized StoredNonce (JSON bytes).
pub(crate) const NONCES: TableDefinition<&str, &[u8]> = TableDefinition::new("nonces");

/// Wallet bindings: identity id → serialized WalletIdentity.
pub(crate) const WALLET_IDENTITIES: TableDefinition<u64, &[u8]> =
    TableDefinition::new("wallet_identities");

/// Unique index: normalized wallet address → identity id.
pub(crate) const WALLET_ADDRESS_INDEX: TableDefinition<&str, u64> =
    TableDefinition::new("wallet_address_index");

/// Accounts: uid → serialized Account.
pub(crate) const ACCOUNTS: TableDefinition<u64, &[u8]> = TableDefinition::new("accounts");

/// Unique index: username → uid.
pub(crate) const ACCOUNT_USERNAME_INDEX: TableDefinition<&str, u64> =
    TableDefinition::new("account_username_index");

/// Login sessions: hex sha256 of the session token → serialized StoredSession.
pub(crate) const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

/// Id sequences: name → last allocated value.
pub(crate) const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

/// Audit trail: composite key (millis_be | uuid) → serialized AuditEvent.
pub(crate) const AUDIT_EVENTS: TableDefinition<&[u8], &[u8]> =
    TableDefinition::new("audit_events");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("unique constraint `{index}` violated by key {key}")]
    UniqueViolation { index: &'static str, key: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid write: {0}")]
    Invalid(String),
}

impl StoreError {
    /// True when the error is a unique-index violation.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Sequences
// =============================================================================

/// Allocate the next id of a named sequence inside an open write transaction.
///
/// Ids start at 1; 0 is reserved for "no owner".
pub(crate) fn next_id(txn: &WriteTransaction, sequence: &str) -> StoreResult<u64> {
    let mut table = txn.open_table(SEQUENCES)?;
    let current = table.get(sequence)?.map(|v| v.value()).unwrap_or(0);
    let next = current + 1;
    table.insert(sequence, next)?;
    Ok(next)
}

// =============================================================================
// AuthDatabase
// =============================================================================

/// Embedded ACID store for nonces, wallet identities, accounts and sessions.
pub struct AuthDatabase {
    pub(crate) db: Database,
}

impl AuthDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;
        Self::with_tables(db)
    }

    /// Open a volatile database that lives only in memory.
    pub fn in_memory() -> StoreResult<Self> {
        let db = Database::builder().create_with_backend(InMemoryBackend::new())?;
        Self::with_tables(db)
    }

    fn with_tables(db: Database) -> StoreResult<Self> {
        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(NONCES)?;
            let _ = write_txn.open_table(WALLET_IDENTITIES)?;
            let _ = write_txn.open_table(WALLET_ADDRESS_INDEX)?;
            let _ = write_txn.open_table(ACCOUNTS)?;
            let _ = write_txn.open_table(ACCOUNT_USERNAME_INDEX)?;
            let _ = write_txn.open_table(SESSIONS)?;
            let _ = write_txn.open_table(SEQUENCES)?;
            let _ = write_txn.open_table(AUDIT_EVENTS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Verify the database answers read transactions.
    pub fn health_check(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(SEQUENCES)?;
        Ok(())
    }
}
