// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registration and login.

use chrono::Utc;

use super::{Vault, VaultError, VaultResult};
use crate::auth::{AuthorityLevel, Identity, PasswordVerifier};
use crate::storage::{Account, AuditAction, AuditEvent};

/// Audit event for a registration attempt by `identity`.
pub fn register_event(identity: &Identity, user_id: &str, authority: i64) -> AuditEvent {
    AuditEvent::new(AuditAction::Register, identity)
        .with_details(format!("user_id={user_id} authority={authority}"))
}

pub fn login_event(identity: &Identity, user_id: &str) -> AuditEvent {
    AuditEvent::new(AuditAction::Login, identity).with_details(format!("user_id={user_id}"))
}

impl Vault {
    /// Bind a new account to `identity`.
    ///
    /// Fails with `InvalidAuthority` outside 0-255 and with
    /// `AlreadyRegistered` when either the identity or the user id is taken.
    pub fn register(
        &self,
        identity: &Identity,
        user_id: &str,
        password: &str,
        authority: i64,
    ) -> VaultResult<()> {
        let event = register_event(identity, user_id, authority);

        let authority = match AuthorityLevel::try_from(authority) {
            Ok(level) => level,
            Err(e) => return Err(self.reject(event, e.into())),
        };

        // Derived outside the write transaction.
        let verifier = match PasswordVerifier::derive(password, self.hash_iterations, &self.rng) {
            Ok(verifier) => verifier,
            Err(_) => {
                return Err(self.fail(event, VaultError::Internal("password hashing failed".into())))
            }
        };

        self.audited(event, |txn| {
            if txn.account(identity)?.is_some() || txn.user_id_taken(user_id)? {
                return Err(VaultError::AlreadyRegistered);
            }

            txn.insert_account(&Account {
                identity: identity.clone(),
                user_id: user_id.to_string(),
                verifier,
                authority,
                registered_at: Utc::now(),
            })?;
            Ok(())
        })?;

        tracing::info!(%identity, user_id, "account registered");
        Ok(())
    }

    /// Check credentials for `identity`. Returns `false` without saying why.
    ///
    /// Accounts never change once written, so the verifier is read from a
    /// snapshot and checked with no transaction open.
    pub fn authenticate(&self, identity: &Identity, user_id: &str, password: &str) -> VaultResult<bool> {
        let event = login_event(identity, user_id);

        let account = self
            .db
            .snapshot()
            .and_then(|snapshot| snapshot.account(identity))
            .map_err(VaultError::from);

        let outcome = account.and_then(|account| {
            let account = account.ok_or(VaultError::InvalidCredentials)?;

            // Verify even on a user id mismatch so both failures cost the same.
            let password_ok = account.verifier.verify(password);
            if account.user_id != user_id || !password_ok {
                return Err(VaultError::InvalidCredentials);
            }
            Ok(())
        });

        match self.settle(event, outcome) {
            Ok(()) => Ok(true),
            Err(VaultError::InvalidCredentials) => Ok(false),
            Err(other) => Err(other),
        }
    }
}
