// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Random opaque tokens for nonces and sessions.

use base64ct::{Base64UrlUnpadded, Encoding};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};

/// Bytes of entropy per token (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Entropy source failed.
#[derive(Debug, thiserror::Error)]
#[error("system random number generator unavailable")]
pub struct EntropyError;

fn random_bytes() -> Result<[u8; TOKEN_BYTES], EntropyError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| EntropyError)?;
    Ok(bytes)
}

/// Generate a URL-safe random token (43 characters of base64url).
pub fn random_token() -> Result<String, EntropyError> {
    Ok(Base64UrlUnpadded::encode_string(&random_bytes()?))
}

/// Generate a sign-in nonce: 64 lowercase hex characters.
///
/// EIP-4361 only allows alphanumeric nonces, so base64url is not usable here.
pub fn random_nonce() -> Result<String, EntropyError> {
    Ok(alloy::hex::encode(random_bytes()?))
}

/// Hex SHA-256 of a token, used as the storage key for session tokens.
pub fn digest(token: &str) -> String {
    alloy::hex::encode(Sha256::digest(token.as_bytes()))
}
