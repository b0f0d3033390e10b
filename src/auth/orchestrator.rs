// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! End-to-end wallet sign-in.
//!
//! ```text
//! Received -> AddressValidated -> NonceValidated -> SignatureVerified
//!          -> NonceConsumed -> IdentityResolved
//! ```
//!
//! A failure at any step rejects the request with the stage it reached.
//! The nonce is consumed only once the signature has verified, so a bad
//! signature leaves the nonce usable until its TTL. Establishing the
//! session is left to the caller.

use std::sync::Arc;

use tracing::{info, warn};

use crate::storage::{Account, AuditEvent, AuditEventType, AuditLog};

use super::address::WalletAddress;
use super::binder::IdentityBinder;
use super::clock::Clock;
use super::error::AuthError;
use super::nonce::{IssuedNonce, NonceStore};
use super::verify::SignatureVerifier;

/// Parsed `POST /wallet-auth/authenticate` body.
#[derive(Debug, Clone)]
pub struct AuthenticationRequest {
    pub wallet_address: String,
    pub message: String,
    pub signature: String,
    pub nonce: String,
}

/// Last stage an authentication request completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    Received,
    AddressValidated,
    NonceValidated,
    SignatureVerified,
    NonceConsumed,
    IdentityResolved,
}

impl AuthStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthStage::Received => "received",
            AuthStage::AddressValidated => "address_validated",
            AuthStage::NonceValidated => "nonce_validated",
            AuthStage::SignatureVerified => "signature_verified",
            AuthStage::NonceConsumed => "nonce_consumed",
            AuthStage::IdentityResolved => "identity_resolved",
        }
    }
}

/// A rejected authentication: where it stopped and why.
#[derive(Debug, thiserror::Error)]
#[error("authentication rejected after {}: {error}", stage.as_str())]
pub struct Rejection {
    pub stage: AuthStage,
    pub error: AuthError,
}

/// A successful authentication.
#[derive(Debug, Clone)]
pub struct AuthenticatedAccount {
    pub account: Account,
    pub wallet_address: WalletAddress,
    /// The account was created by this sign-in.
    pub created: bool,
}

/// Runs the sign-in protocol over the nonce store, verifier and binder.
#[derive(Clone)]
pub struct WalletAuthenticator {
    nonces: NonceStore,
    verifier: SignatureVerifier,
    binder: IdentityBinder,
    audit: Arc<dyn AuditLog>,
    clock: Arc<dyn Clock>,
}

impl WalletAuthenticator {
    pub fn new(
        nonces: NonceStore,
        verifier: SignatureVerifier,
        binder: IdentityBinder,
        audit: Arc<dyn AuditLog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            nonces,
            verifier,
            binder,
            audit,
            clock,
        }
    }

    pub fn nonces(&self) -> &NonceStore {
        &self.nonces
    }

    pub fn binder(&self) -> &IdentityBinder {
        &self.binder
    }

    /// Issue a sign-in nonce for `raw_address`.
    pub fn issue_nonce(&self, raw_address: &str) -> Result<IssuedNonce, AuthError> {
        let address = WalletAddress::parse(raw_address).inspect_err(|_| {
            warn!(wallet_address = %raw_address, "Nonce requested for invalid wallet address");
        })?;
        let issued = self.nonces.issue(&address)?;
        self.audit(self.event(AuditEventType::NonceIssued).with_wallet(address.as_str()));
        Ok(issued)
    }

    /// Authenticate a signed sign-in message.
    pub fn authenticate(
        &self,
        request: &AuthenticationRequest,
    ) -> Result<AuthenticatedAccount, Rejection> {
        match self.run(request) {
            Ok(authenticated) => {
                info!(
                    wallet_address = %authenticated.wallet_address,
                    uid = authenticated.account.uid,
                    created = authenticated.created,
                    "Wallet authenticated"
                );
                if authenticated.created {
                    self.audit(
                        self.event(AuditEventType::AccountCreated)
                            .with_wallet(authenticated.wallet_address.as_str())
                            .with_uid(authenticated.account.uid),
                    );
                }
                self.audit(
                    self.event(AuditEventType::AuthSuccess)
                        .with_wallet(authenticated.wallet_address.as_str())
                        .with_uid(authenticated.account.uid),
                );
                Ok(authenticated)
            }
            Err(rejection) => {
                warn!(
                    wallet_address = %request.wallet_address,
                    stage = rejection.stage.as_str(),
                    reason = %rejection.error,
                    code = rejection.error.error_code(),
                    "Wallet authentication rejected"
                );
                self.audit(
                    self.event(AuditEventType::AuthFailure)
                        .with_wallet(request.wallet_address.as_str())
                        .failed(rejection.error.to_string()),
                );
                Err(rejection)
            }
        }
    }

    fn run(&self, request: &AuthenticationRequest) -> Result<AuthenticatedAccount, Rejection> {
        let address =
            WalletAddress::parse(&request.wallet_address).map_err(after(AuthStage::Received))?;

        self.nonces
            .validate(&request.nonce, &address)
            .map_err(|e| after(AuthStage::AddressValidated)(e.into()))?;

        let message = self
            .verifier
            .check(&request.message, &request.signature, &address)
            .map_err(|failure| {
                after(AuthStage::NonceValidated)(AuthError::SignatureInvalid(failure))
            })?;
        if message.nonce != request.nonce {
            return Err(after(AuthStage::NonceValidated)(
                AuthError::MessageNonceMismatch,
            ));
        }

        self.nonces
            .validate_and_consume(&request.nonce, &address)
            .map_err(|e| after(AuthStage::SignatureVerified)(e.into()))?;

        let resolved = self
            .binder
            .login_or_create(&address)
            .map_err(after(AuthStage::NonceConsumed))?;

        Ok(AuthenticatedAccount {
            account: resolved.account,
            wallet_address: address,
            created: resolved.created,
        })
    }

    fn event(&self, event_type: AuditEventType) -> AuditEvent {
        AuditEvent::new(event_type, self.clock.now())
    }

    fn audit(&self, event: AuditEvent) {
        if let Err(e) = self.audit.record(&event) {
            warn!(error = %e, event_type = ?event.event_type, "Failed to write audit event");
        }
    }
}

fn after(stage: AuthStage) -> impl Fn(AuthError) -> Rejection {
    move |error| Rejection { stage, error }
}
