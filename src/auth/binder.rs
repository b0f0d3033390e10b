// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet address to account binding.
//!
//! Every verified wallet address maps to exactly one account. The first
//! successful sign-in for an address creates the account and the binding in
//! one storage transaction; the unique address index makes the loser of a
//! concurrent first sign-in fail, and the binder recovers by re-reading the
//! winner's record.

use std::sync::Arc;

use tracing::{info, warn};

use crate::storage::{
    Account, AccountRepository, StoreError, WalletIdentity, WalletIdentityRepository,
};

use super::address::WalletAddress;
use super::clock::Clock;
use super::error::AuthError;

/// Prefix of usernames derived from wallet addresses.
pub const USERNAME_PREFIX: &str = "wallet_";

/// Deterministic username for a wallet: `wallet_` + 40 lowercase hex chars.
pub fn username_for(address: &WalletAddress) -> String {
    format!("{USERNAME_PREFIX}{}", address.hex())
}

/// Result of [`IdentityBinder::login_or_create`].
#[derive(Debug, Clone)]
pub struct Resolved {
    pub account: Account,
    pub identity: WalletIdentity,
    /// A new binding was created by this call.
    pub created: bool,
}

/// Resolves wallet addresses to accounts.
#[derive(Clone)]
pub struct IdentityBinder {
    identities: Arc<dyn WalletIdentityRepository>,
    accounts: Arc<dyn AccountRepository>,
    clock: Arc<dyn Clock>,
}

impl IdentityBinder {
    pub fn new(
        identities: Arc<dyn WalletIdentityRepository>,
        accounts: Arc<dyn AccountRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            identities,
            accounts,
            clock,
        }
    }

    pub fn load_by_address(
        &self,
        address: &WalletAddress,
    ) -> Result<Option<WalletIdentity>, AuthError> {
        Ok(self.identities.load_identity_by_address(address.as_str())?)
    }

    /// Create the binding and its account.
    ///
    /// Fails with [`AuthError::DuplicateAddressRace`] if the address is
    /// already bound; callers must re-load rather than retry.
    pub fn create_for_address(
        &self,
        address: &WalletAddress,
    ) -> Result<(WalletIdentity, Account), AuthError> {
        let username = username_for(address);
        self.identities
            .create_identity_with_account(address.as_str(), &username, self.clock.now())
            .map_err(|e| match e {
                StoreError::UniqueViolation {
                    index: "wallet_address_index",
                    ..
                } => AuthError::DuplicateAddressRace,
                other => other.into(),
            })
    }

    /// Load or create the account bound to `address` and stamp
    /// `last_used_at`.
    pub fn login_or_create(&self, address: &WalletAddress) -> Result<Resolved, AuthError> {
        let identity = match self.load_by_address(address)? {
            Some(identity) => identity,
            None => match self.create_for_address(address) {
                Ok((identity, account)) => {
                    info!(
                        wallet_address = %address,
                        uid = account.uid,
                        username = %account.username,
                        "Created account for new wallet"
                    );
                    return Ok(Resolved {
                        account,
                        identity,
                        created: true,
                    });
                }
                Err(AuthError::DuplicateAddressRace) => {
                    warn!(wallet_address = %address, "Concurrent first sign-in, re-loading binding");
                    self.load_by_address(address)?.ok_or_else(|| {
                        AuthError::Internal(format!(
                            "binding for {address} vanished after duplicate insert"
                        ))
                    })?
                }
                Err(e) => return Err(e),
            },
        };

        if !identity.active {
            return Err(AuthError::WalletRevoked);
        }

        let owned = if identity.is_owned() {
            self.accounts.load_account(identity.owner_uid)?
        } else {
            None
        };
        let account = match owned {
            Some(account) => account,
            None => self.attach_account(address)?,
        };

        // A revoke may have committed since the load above; the stamp
        // re-reads the row and leaves a revoked one as it is.
        let identity = self
            .identities
            .record_login(identity.id, account.uid, self.clock.now())
            .map_err(|e| match e {
                StoreError::NotFound(_) => {
                    AuthError::Internal(format!("binding for {address} removed during sign-in"))
                }
                other => other.into(),
            })?;
        if !identity.active {
            warn!(wallet_address = %address, "Wallet revoked during sign-in");
            return Err(AuthError::WalletRevoked);
        }

        Ok(Resolved {
            account,
            identity,
            created: false,
        })
    }

    /// Revoke (`false`) or reinstate (`true`) a wallet without deleting it.
    ///
    /// Only the `active` flag is written; concurrent logins keep their
    /// `last_used_at` stamp.
    pub fn set_active(
        &self,
        address: &WalletAddress,
        active: bool,
    ) -> Result<WalletIdentity, AuthError> {
        let identity = self
            .load_by_address(address)?
            .ok_or(AuthError::UnknownWallet)?;
        let identity = self
            .identities
            .set_identity_active(identity.id, active)
            .map_err(|e| match e {
                StoreError::NotFound(_) => AuthError::UnknownWallet,
                other => other.into(),
            })?;
        info!(wallet_address = %address, active, "Wallet status changed");
        Ok(identity)
    }

    /// Remove the binding. The account itself is kept.
    pub fn delete(&self, address: &WalletAddress) -> Result<bool, AuthError> {
        let Some(identity) = self.load_by_address(address)? else {
            return Ok(false);
        };
        let removed = self.identities.delete_identity(identity.id)?;
        if removed {
            info!(wallet_address = %address, uid = identity.owner_uid, "Wallet binding deleted");
        }
        Ok(removed)
    }

    /// Account for an unowned binding: reuse the derived username if it
    /// exists, otherwise create it.
    fn attach_account(&self, address: &WalletAddress) -> Result<Account, AuthError> {
        let username = username_for(address);
        if let Some(account) = self.accounts.load_account_by_username(&username)? {
            return Ok(account);
        }
        match self.accounts.create_account(&username, self.clock.now()) {
            Ok(account) => Ok(account),
            Err(e) if e.is_unique_violation() => self
                .accounts
                .load_account_by_username(&username)?
                .ok_or_else(|| AuthError::Internal(format!("account {username} vanished"))),
            Err(e) => Err(e.into()),
        }
    }
}
