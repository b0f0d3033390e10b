// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EIP-191 signature recovery and EIP-4361 message checks.
//!
//! The signed text must be a Sign-In with Ethereum message. Verification
//! recovers the signer from the `personal_sign` hash of the exact message
//! bytes and compares it to the claimed address. Nothing here touches the
//! network or storage.

use std::sync::Arc;

use alloy::primitives::{Address, Signature};
use chrono::{DateTime, Utc};
use time::OffsetDateTime;
use tracing::debug;

use super::address::WalletAddress;
use super::clock::Clock;

/// Why a signed message was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationFailure {
    #[error("signature is not 65 bytes of hex")]
    MalformedSignature,

    #[error("could not recover signer from signature")]
    RecoveryFailed,

    #[error("recovered signer does not match the claimed address")]
    SignerMismatch,

    #[error("message is not a valid sign-in message: {0}")]
    MalformedMessage(String),

    #[error("message was issued for a different address")]
    AddressLineMismatch,

    #[error("message domain does not match this site")]
    DomainMismatch,

    #[error("message chain id does not match the configured network")]
    ChainIdMismatch,

    #[error("message is expired or not yet valid")]
    OutsideValidityWindow,
}

/// Checks signed sign-in messages.
#[derive(Clone)]
pub struct SignatureVerifier {
    expected_domain: Option<String>,
    expected_chain_id: Option<u64>,
    clock: Arc<dyn Clock>,
}

impl SignatureVerifier {
    /// Verifier that only enforces signature, address and validity window.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            expected_domain: None,
            expected_chain_id: None,
            clock,
        }
    }

    /// Require the message domain (`host[:port]`) to equal `domain`.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.expected_domain = Some(domain.into());
        self
    }

    /// Require the message `Chain ID` to equal `chain_id`.
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.expected_chain_id = Some(chain_id);
        self
    }

    /// True iff `signature` over `message` was produced by `claimed_address`
    /// and `message` is an acceptable sign-in message. Never panics.
    pub fn verify(&self, message: &str, signature: &str, claimed_address: &str) -> bool {
        match WalletAddress::parse(claimed_address) {
            Ok(claimed) => self.check(message, signature, &claimed).is_ok(),
            Err(_) => false,
        }
    }

    /// Like [`verify`](Self::verify), but returns the parsed message or the
    /// reason for rejection.
    pub fn check(
        &self,
        message: &str,
        signature: &str,
        claimed_address: &WalletAddress,
    ) -> Result<siwe::Message, VerificationFailure> {
        let parsed = message
            .parse::<siwe::Message>()
            .map_err(|e| VerificationFailure::MalformedMessage(e.to_string()))?;

        if WalletAddress::from(Address::from(parsed.address)) != *claimed_address {
            return Err(VerificationFailure::AddressLineMismatch);
        }

        if let Some(domain) = &self.expected_domain {
            if !parsed.domain.as_str().eq_ignore_ascii_case(domain) {
                return Err(VerificationFailure::DomainMismatch);
            }
        }

        if let Some(chain_id) = self.expected_chain_id {
            if parsed.chain_id != chain_id {
                return Err(VerificationFailure::ChainIdMismatch);
            }
        }

        let now = to_offset_date_time(self.clock.now())?;
        if !parsed.valid_at(&now) {
            return Err(VerificationFailure::OutsideValidityWindow);
        }

        let signer = recover_signer(message, signature)?;
        if WalletAddress::from(signer) != *claimed_address {
            debug!(
                claimed = %claimed_address,
                recovered = %WalletAddress::from(signer),
                "Recovered signer differs from claimed address"
            );
            return Err(VerificationFailure::SignerMismatch);
        }

        Ok(parsed)
    }

    /// Nonce embedded in a sign-in message, if the message parses.
    pub fn embedded_nonce(message: &str) -> Option<String> {
        message
            .parse::<siwe::Message>()
            .ok()
            .map(|parsed| parsed.nonce)
    }
}

/// Recover the `personal_sign` signer of `message`.
///
/// `signature` is 65 bytes (`r || s || v`) as hex, with or without `0x`;
/// `v` may be 0/1 or 27/28.
pub fn recover_signer(message: &str, signature: &str) -> Result<Address, VerificationFailure> {
    let bytes = alloy::hex::decode(signature.trim())
        .map_err(|_| VerificationFailure::MalformedSignature)?;
    if bytes.len() != 65 {
        return Err(VerificationFailure::MalformedSignature);
    }
    let signature =
        Signature::from_raw(&bytes).map_err(|_| VerificationFailure::MalformedSignature)?;
    signature
        .recover_address_from_msg(message.as_bytes())
        .map_err(|_| VerificationFailure::RecoveryFailed)
}

fn to_offset_date_time(now: DateTime<Utc>) -> Result<OffsetDateTime, VerificationFailure> {
    OffsetDateTime::from_unix_timestamp(now.timestamp())
        .map_err(|_| VerificationFailure::OutsideValidityWindow)
}
