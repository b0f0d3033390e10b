// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet address validation and normalization.
//!
//! Accepted format: `0x` followed by exactly 40 hexadecimal characters, any
//! case. Every address is stored and compared in its normalized (lowercase)
//! form so that case variants of one address never produce two records.

use std::str::FromStr;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use super::AuthError;

/// Length of the hex part of an address.
const ADDRESS_HEX_LEN: usize = 40;

/// Returns true iff `raw` is `0x` + 40 hex characters.
pub fn validate(raw: &str) -> bool {
    match raw.strip_prefix("0x") {
        Some(hex) => hex.len() == ADDRESS_HEX_LEN && hex.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}

/// Canonical (lowercase) form used for storage and comparison.
pub fn normalize(raw: &str) -> String {
    raw.to_ascii_lowercase()
}

/// Validated, normalized wallet address.
///
/// # Example
///
/// ```rust,ignore
/// let addr = WalletAddress::parse("0x71C7656EC7ab88b098defB751B7401B5f6d8976F")?;
/// assert_eq!(addr.as_str(), "0x71c7656ec7ab88b098defb751b7401b5f6d8976f");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Validate and normalize a raw address string.
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        if validate(raw) {
            Ok(Self(normalize(raw)))
        } else {
            Err(AuthError::InvalidAddressFormat)
        }
    }

    /// Normalized form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 40 lowercase hex characters without the `0x` prefix.
    pub fn hex(&self) -> &str {
        &self.0[2..]
    }

    /// EIP-55 mixed-case rendering.
    pub fn checksummed(&self) -> String {
        match Address::from_str(&self.0) {
            Ok(address) => address.to_checksum(None),
            Err(_) => self.0.clone(),
        }
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WalletAddress {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = AuthError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

impl From<Address> for WalletAddress {
    fn from(value: Address) -> Self {
        Self(format!("0x{}", alloy::hex::encode(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIXED: &str = "0x71C7656EC7ab88b098defB751B7401B5f6d8976F";
    const LOWER: &str = "0x71c7656ec7ab88b098defb751b7401b5f6d8976f";

    #[test]
    fn accepts_well_formed_addresses() {
        assert!(validate(MIXED));
        assert!(validate(LOWER));
        assert!(validate(&LOWER.to_ascii_uppercase().replacen("0X", "0x", 1)));
    }

    #[test]
    fn rejects_malformed_addresses() {
        for raw in [
            "",
            "invalid",
            "0x123",
            "1234567890123456789012345678901234567890",
            "0X71C7656EC7ab88b098defB751B7401B5f6d8976F",
            "0x71C7656EC7ab88b098defB751B7401B5f6d8976",
            "0x71C7656EC7ab88b098defB751B7401B5f6d8976F0",
            "0x71C7656EC7ab88b098defB751B7401B5f6d8976G",
            " 0x71C7656EC7ab88b098defB751B7401B5f6d8976F",
            "0x71C7656EC7ab88b098defB751B7401B5f6d897é",
        ] {
            assert!(!validate(raw), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn normalize_is_idempotent_and_case_insensitive() {
        assert_eq!(normalize(MIXED), LOWER);
        assert_eq!(normalize(&normalize(MIXED)), normalize(MIXED));
        assert_eq!(normalize(MIXED), normalize(LOWER));
    }

    #[test]
    fn parse_normalizes() {
        let addr = WalletAddress::parse(MIXED).unwrap();
        assert_eq!(addr.as_str(), LOWER);
        assert_eq!(addr.hex().len(), 40);
        assert!(matches!(
            WalletAddress::parse("0x123"),
            Err(AuthError::InvalidAddressFormat)
        ));
    }

    #[test]
    fn checksum_rendering_matches_eip55() {
        let addr = WalletAddress::parse("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266").unwrap();
        assert_eq!(
            addr.checksummed(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
    }

    #[test]
    fn deserialization_validates() {
        let ok: WalletAddress = serde_json::from_str(&format!("\"{MIXED}\"")).unwrap();
        assert_eq!(ok.as_str(), LOWER);
        assert!(serde_json::from_str::<WalletAddress>("\"0xnope\"").is_err());
    }
}
