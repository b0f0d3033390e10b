// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Test fixtures: well-known development keys and SIWE message builders.

use std::str::FromStr;

use alloy::signers::{local::PrivateKeySigner, SignerSync};

/// Hardhat / Anvil development account #0.
pub const DEV_KEY_0: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const DEV_ADDRESS_0: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

/// Hardhat / Anvil development account #1.
pub const DEV_KEY_1: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
pub const DEV_ADDRESS_1: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

/// Issued At used by [`siwe_message`].
pub const ISSUED_AT: &str = "2026-01-01T00:00:00Z";

pub fn signer(key: &str) -> PrivateKeySigner {
    PrivateKeySigner::from_str(key).unwrap()
}

/// Minimal EIP-4361 message for `example.com` on chain 1.
pub fn siwe_message(address: &str, nonce: &str) -> String {
    siwe_message_with(address, nonce, "example.com", 1, "")
}

/// EIP-4361 message with explicit domain, chain id and trailing fields
/// (e.g. `"\nExpiration Time: ..."`).
pub fn siwe_message_with(
    address: &str,
    nonce: &str,
    domain: &str,
    chain_id: u64,
    trailing: &str,
) -> String {
    format!(
        "{domain} wants you to sign in with your Ethereum account:\n\
         {address}\n\
         \n\
         Sign in to Wallet Auth.\n\
         \n\
         URI: https://{domain}/login\n\
         Version: 1\n\
         Chain ID: {chain_id}\n\
         Nonce: {nonce}\n\
         Issued At: {ISSUED_AT}{trailing}"
    )
}

/// `personal_sign` a message, returning `0x`-prefixed 65-byte hex.
pub fn sign(key: &str, message: &str) -> String {
    let signature = signer(key).sign_message_sync(message.as_bytes()).unwrap();
    alloy::hex::encode_prefixed(signature.as_bytes())
}
