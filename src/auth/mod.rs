// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Wallet signature (Sign-In with Ethereum) authentication.
//!
//! ## Auth Flow
//!
//! 1. Client requests a nonce for its wallet address (`/wallet-auth/nonce`)
//! 2. Wallet signs an EIP-4361 message embedding that nonce (`personal_sign`)
//! 3. Server:
//!    - Validates the address format
//!    - Checks the nonce exists, is unexpired and was issued to that address
//!    - Recovers the signer and checks the message
//!    - Consumes the nonce
//!    - Loads or creates the account bound to the address
//! 4. A session cookie is issued by the API layer
//!
//! ## Security
//!
//! - Nonces are single use, 256-bit, and expire after the configured lifetime
//! - Nonce consumption and identity creation are single storage transactions
//! - Clients only learn "invalid address" vs "invalid signature" vs
//!   "internal failure"; the precise reason goes to the log and audit trail

pub mod address;
pub mod binder;
pub mod clock;
pub mod error;
pub mod nonce;
pub mod orchestrator;
pub mod session;
pub mod token;
pub mod verify;

#[cfg(test)]
pub(crate) mod testing;

pub use address::WalletAddress;
pub use binder::{IdentityBinder, Resolved};
pub use clock::{Clock, SystemClock};
pub use error::{AuthError, FailureClass};
pub use nonce::{IssuedNonce, NonceError, NonceStore};
pub use orchestrator::{
    AuthStage, AuthenticatedAccount, AuthenticationRequest, Rejection, WalletAuthenticator,
};
pub use session::{Session, SessionManager};
pub use verify::{SignatureVerifier, VerificationFailure};
