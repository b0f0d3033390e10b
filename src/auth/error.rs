// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use crate::storage::StoreError;

use super::nonce::NonceError;
use super::verify::VerificationFailure;

/// Coarse classes of failure the HTTP boundary is allowed to reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The submitted address is not `0x` + 40 hex characters.
    InvalidAddress,
    /// Any nonce, signature or wallet-status failure.
    Credential,
    /// Infrastructure failure.
    Internal,
}

/// Authentication error type.
///
/// Variants carry the precise reason for logs and the audit trail; clients
/// only ever see the [`FailureClass`].
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid wallet address format")]
    InvalidAddressFormat,

    #[error("nonce not found")]
    NonceNotFound,

    #[error("nonce expired")]
    NonceExpired,

    #[error("nonce was issued to a different wallet address")]
    NonceAddressMismatch,

    #[error("signature invalid: {0}")]
    SignatureInvalid(VerificationFailure),

    #[error("signed message nonce does not match the request nonce")]
    MessageNonceMismatch,

    #[error("wallet has been revoked")]
    WalletRevoked,

    #[error("wallet is not bound to any account")]
    UnknownWallet,

    #[error("wallet address was bound by a concurrent request")]
    DuplicateAddressRace,

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("internal authentication error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidAddressFormat => "invalid_address_format",
            AuthError::NonceNotFound => "nonce_not_found",
            AuthError::NonceExpired => "nonce_expired",
            AuthError::NonceAddressMismatch => "nonce_address_mismatch",
            AuthError::SignatureInvalid(_) => "signature_invalid",
            AuthError::MessageNonceMismatch => "message_nonce_mismatch",
            AuthError::WalletRevoked => "wallet_revoked",
            AuthError::UnknownWallet => "unknown_wallet",
            AuthError::DuplicateAddressRace => "duplicate_address_race",
            AuthError::StorageUnavailable(_) => "storage_unavailable",
            AuthError::Internal(_) => "internal_error",
        }
    }

    /// Which class of failure this is, for the HTTP mapping.
    pub fn class(&self) -> FailureClass {
        match self {
            AuthError::InvalidAddressFormat => FailureClass::InvalidAddress,
            AuthError::NonceNotFound
            | AuthError::NonceExpired
            | AuthError::NonceAddressMismatch
            | AuthError::SignatureInvalid(_)
            | AuthError::MessageNonceMismatch
            | AuthError::WalletRevoked
            | AuthError::UnknownWallet => FailureClass::Credential,
            AuthError::DuplicateAddressRace
            | AuthError::StorageUnavailable(_)
            | AuthError::Internal(_) => FailureClass::Internal,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        AuthError::StorageUnavailable(e.to_string())
    }
}

impl From<NonceError> for AuthError {
    fn from(e: NonceError) -> Self {
        match e {
            NonceError::NotFound => AuthError::NonceNotFound,
            NonceError::Expired => AuthError::NonceExpired,
            NonceError::AddressMismatch => AuthError::NonceAddressMismatch,
            NonceError::Storage(msg) => AuthError::StorageUnavailable(msg),
            NonceError::Entropy => AuthError::Internal("random source failure".to_string()),
        }
    }
}
