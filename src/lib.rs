// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet Auth - Sign-In with Ethereum authentication service
//!
//! Proves control of a wallet private key with a signed, single-use
//! nonce, binds the wallet to one site account and starts a session.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Nonces, signature verification and identity binding
//! - `storage` - Embedded database (redb) and audit log
//! - `sweeper` - Background purge of expired nonces and sessions

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
pub mod sweeper;
