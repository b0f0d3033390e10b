// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login sessions established after a successful wallet sign-in.
//!
//! The client holds a random 256-bit token (in a cookie); only its SHA-256
//! digest is stored, so a leaked database does not yield usable sessions.
//!
//! A session is tied to the wallet binding it was opened with. Revoking or
//! unbinding the wallet ends the session on its next lookup, and
//! reinstating the wallet does not bring it back.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::storage::{
    Account, AccountRepository, SessionRepository, StoredSession, WalletIdentityRepository,
};

use super::address::WalletAddress;
use super::clock::Clock;
use super::error::AuthError;
use super::token::{digest, random_token};

/// An established session, as handed to the client.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub uid: u64,
    pub expires_at: DateTime<Utc>,
}

/// Creates, resolves and ends login sessions.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<dyn SessionRepository>,
    identities: Arc<dyn WalletIdentityRepository>,
    accounts: Arc<dyn AccountRepository>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        identities: Arc<dyn WalletIdentityRepository>,
        accounts: Arc<dyn AccountRepository>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions,
            identities,
            accounts,
            ttl,
            clock,
        }
    }

    /// Session lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a session for `account`, signed in with `wallet_address`.
    pub fn finalize_login(
        &self,
        account: &Account,
        wallet_address: &WalletAddress,
    ) -> Result<Session, AuthError> {
        let now = self.clock.now();
        let expires_at = now.checked_add_signed(self.ttl).ok_or_else(|| {
            AuthError::Internal(format!(
                "session lifetime of {}s overflows the expiry timestamp",
                self.ttl.num_seconds()
            ))
        })?;
        let token = random_token().map_err(|e| AuthError::Internal(e.to_string()))?;
        let stored = StoredSession {
            token_digest: digest(&token),
            uid: account.uid,
            wallet_address: wallet_address.as_str().to_string(),
            created_at: now,
            expires_at,
        };
        self.sessions.put_session(&stored)?;
        debug!(uid = account.uid, expires_at = %stored.expires_at, "Session established");

        Ok(Session {
            token,
            uid: account.uid,
            expires_at,
        })
    }

    /// Account logged in with `token`, or `None` for anonymous.
    ///
    /// Expired sessions, and sessions whose wallet binding is revoked,
    /// removed or re-owned, are deleted on lookup.
    pub fn current_account(&self, token: &str) -> Result<Option<Account>, AuthError> {
        let token_digest = digest(token);
        let Some(session) = self.sessions.load_session(&token_digest)? else {
            return Ok(None);
        };
        if session.is_expired(self.clock.now()) {
            self.sessions.delete_session(&token_digest)?;
            return Ok(None);
        }

        let bound = self
            .identities
            .load_identity_by_address(&session.wallet_address)?
            .is_some_and(|identity| identity.active && identity.owner_uid == session.uid);
        if !bound {
            info!(
                uid = session.uid,
                wallet_address = %session.wallet_address,
                "Session ended: wallet no longer bound to the account"
            );
            self.sessions.delete_session(&token_digest)?;
            return Ok(None);
        }

        Ok(self.accounts.load_account(session.uid)?)
    }

    /// End the session for `token`. Returns whether one existed.
    pub fn logout(&self, token: &str) -> Result<bool, AuthError> {
        Ok(self.sessions.delete_session(&digest(token))?)
    }

    /// Delete every expired session.
    pub fn purge_expired(&self) -> Result<usize, AuthError> {
        Ok(self.sessions.purge_expired_sessions(self.clock.now())?)
    }
}
