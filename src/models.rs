// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! This module defines the request and response data structures used by
//! the REST API. All types derive `Serialize` or `Deserialize`, and
//! `ToSchema` for OpenAPI documentation.
//!
//! Request fields default to empty strings so that a missing field is
//! reported like any other malformed input instead of as a JSON error.
//!
//! ## Model Categories
//!
//! - **Sign-in**: nonce issuance and signature authentication
//! - **Session**: current account and logout
//! - **Admin**: wallet revocation and audit trail

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::config::Network;
use crate::storage::{AuditEvent, WalletIdentity};

// =============================================================================
// Sign-in Models
// =============================================================================

/// Query for `GET /wallet-auth/nonce`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct NonceQuery {
    /// Wallet address the nonce is issued to.
    #[serde(default)]
    pub wallet_address: String,
}

/// Body of `POST /wallet-auth/nonce`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct NonceRequest {
    /// Wallet address the nonce is issued to.
    #[serde(default)]
    #[schema(example = "0x71C7656EC7ab88b098defB751B7401B5f6d8976F")]
    pub wallet_address: String,
}

/// A freshly issued sign-in nonce.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NonceResponse {
    pub success: bool,
    /// Value to embed as `Nonce:` in the signed message.
    pub nonce: String,
    /// EIP-55 form of the address, as the signed message must carry it.
    #[schema(example = "0x71C7656EC7ab88b098defB751B7401B5f6d8976F")]
    pub wallet_address: String,
    /// After this instant the nonce is no longer accepted.
    pub expires_at: DateTime<Utc>,
}

/// Body of `POST /wallet-auth/authenticate`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AuthenticateRequest {
    #[serde(default)]
    #[schema(example = "0x71C7656EC7ab88b098defB751B7401B5f6d8976F")]
    pub wallet_address: String,
    /// 65-byte `personal_sign` signature as hex.
    #[serde(default)]
    pub signature: String,
    /// The exact EIP-4361 message that was signed.
    #[serde(default)]
    pub message: String,
    /// Nonce token from `/wallet-auth/nonce`.
    #[serde(default)]
    pub nonce: String,
}

/// Successful sign-in. The session cookie is set on the response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticateResponse {
    pub success: bool,
    pub uid: u64,
    pub username: String,
}

// =============================================================================
// Session Models
// =============================================================================

/// The logged-in account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub success: bool,
    pub uid: u64,
    pub username: String,
}

/// Outcome of `POST /wallet-auth/logout`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Public settings the browser connector needs.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicConfigResponse {
    pub network: Network,
    pub chain_id: u64,
    /// Nonce lifetime in seconds.
    pub nonce_lifetime: u64,
    pub enable_auto_connect: bool,
    pub redirect_on_success: String,
}

// =============================================================================
// Admin Models
// =============================================================================

/// Body of `PUT /wallet-auth/admin/wallets/{wallet_address}/status`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SetWalletStatusRequest {
    /// `false` revokes the wallet, `true` reinstates it.
    pub active: bool,
}

/// A wallet binding with its recent audit trail.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WalletDetailsResponse {
    pub identity: WalletIdentity,
    pub recent_events: Vec<AuditEvent>,
}

/// Query for audit listings.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct AuditQuery {
    /// Maximum number of events (default 50, max 500).
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub const DEFAULT_LIMIT: usize = 50;
    pub const MAX_LIMIT: usize = 500;

    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }
}
