// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{
    Clock, IdentityBinder, NonceStore, SessionManager, SignatureVerifier, WalletAuthenticator,
};
use crate::config::AuthSettings;
use crate::storage::AuthDatabase;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<AuthDatabase>,
    pub authenticator: WalletAuthenticator,
    pub sessions: SessionManager,
    pub settings: Arc<AuthSettings>,
    pub clock: Arc<dyn Clock>,
    /// Bearer token for the admin endpoints; `None` disables them.
    pub admin_token: Option<Arc<str>>,
    /// Mark the session cookie `Secure` (served over HTTPS).
    pub secure_cookies: bool,
}

impl AppState {
    /// Wire the authentication services over one database.
    pub fn new(db: Arc<AuthDatabase>, settings: AuthSettings, clock: Arc<dyn Clock>) -> Self {
        let nonces = NonceStore::new(
            db.clone(),
            chrono::Duration::seconds(settings.nonce_lifetime.as_secs() as i64),
            clock.clone(),
        );

        let mut verifier = SignatureVerifier::new(clock.clone());
        if let Some(domain) = &settings.domain {
            verifier = verifier.with_domain(domain.clone());
        }
        if settings.enforce_chain_id {
            verifier = verifier.with_chain_id(settings.network.chain_id());
        }

        let binder = IdentityBinder::new(db.clone(), db.clone(), clock.clone());
        let authenticator =
            WalletAuthenticator::new(nonces, verifier, binder, db.clone(), clock.clone());
        // Out-of-range lifetimes saturate; `finalize_login` rejects the overflow.
        let session_ttl =
            chrono::Duration::from_std(settings.session_ttl).unwrap_or(chrono::TimeDelta::MAX);
        let sessions = SessionManager::new(
            db.clone(),
            db.clone(),
            db.clone(),
            session_ttl,
            clock.clone(),
        );

        Self {
            db,
            authenticator,
            sessions,
            settings: Arc::new(settings),
            clock,
            admin_token: None,
            secure_cookies: false,
        }
    }

    pub fn with_admin_token(mut self, token: Option<String>) -> Self {
        self.admin_token = token.map(Arc::from);
        self
    }

    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }
}
