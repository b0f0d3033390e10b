// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for authentication events.
//!
//! Every sign-in success and rejection is appended to the `audit_events`
//! table with the wallet address and reason, independently of the tracing
//! output.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::database::{AuthDatabase, StoreResult, AUDIT_EVENTS};

/// Types of auditable events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Nonce events
    NonceIssued,

    // Auth events
    AuthSuccess,
    AuthFailure,
    Logout,

    // Identity events
    AccountCreated,
    WalletRevoked,
    WalletReinstated,
    WalletUnbound,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: AuditEventType,
    /// Wallet address involved, as submitted.
    pub wallet_address: Option<String>,
    /// Account involved (if resolved).
    pub uid: Option<u64>,
    /// Why the operation was rejected.
    pub reason: Option<String>,
    /// Whether the operation succeeded.
    pub success: bool,
}

impl AuditEvent {
    /// Create a new audit event that occurred at `timestamp`.
    pub fn new(event_type: AuditEventType, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            event_type,
            wallet_address: None,
            uid: None,
            reason: None,
            success: true,
        }
    }

    /// Set the wallet address.
    pub fn with_wallet(mut self, wallet_address: impl Into<String>) -> Self {
        self.wallet_address = Some(wallet_address.into());
        self
    }

    /// Set the account.
    pub fn with_uid(mut self, uid: u64) -> Self {
        self.uid = Some(uid);
        self
    }

    /// Mark as failed with a reason.
    pub fn failed(mut self, reason: impl Into<String>) -> Self {
        self.success = false;
        self.reason = Some(reason.into());
        self
    }

    fn key(&self) -> Vec<u8> {
        let mut key = Vec::with_capacity(8 + self.event_id.len());
        key.extend_from_slice(&self.timestamp.timestamp_millis().to_be_bytes());
        key.extend_from_slice(self.event_id.as_bytes());
        key
    }
}

/// Sink for audit events.
pub trait AuditLog: Send + Sync {
    fn record(&self, event: &AuditEvent) -> StoreResult<()>;
}

impl AuditLog for AuthDatabase {
    fn record(&self, event: &AuditEvent) -> StoreResult<()> {
        let json = serde_json::to_vec(event)?;
        let key = event.key();
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(AUDIT_EVENTS)?;
            table.insert(key.as_slice(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

impl AuthDatabase {
    /// Most recent audit events, newest first.
    pub fn recent_audit_events(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUDIT_EVENTS)?;

        let mut events = Vec::with_capacity(limit);
        for entry in table.iter()?.rev() {
            if events.len() >= limit {
                break;
            }
            let (_, value) = entry?;
            events.push(serde_json::from_slice(value.value())?);
        }
        Ok(events)
    }

    /// Audit events touching one wallet address, newest first.
    pub fn audit_events_for_wallet(
        &self,
        wallet_address: &str,
        limit: usize,
    ) -> StoreResult<Vec<AuditEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUDIT_EVENTS)?;

        let mut events = Vec::new();
        for entry in table.iter()?.rev() {
            if events.len() >= limit {
                break;
            }
            let (_, value) = entry?;
            let event: AuditEvent = serde_json::from_slice(value.value())?;
            let matches = event
                .wallet_address
                .as_deref()
                .is_some_and(|a| a.eq_ignore_ascii_case(wallet_address));
            if matches {
                events.push(event);
            }
        }
        Ok(events)
    }
}
