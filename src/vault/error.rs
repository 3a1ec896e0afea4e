// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Vault operation outcomes.

use crate::auth::AuthorityOutOfRange;
use crate::escrow::EscrowError;
use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// No account is bound to the calling identity.
    #[error("caller has no account")]
    NotAuthenticated,

    /// Login failed. Deliberately silent about which check failed.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("identity or user id already registered")]
    AlreadyRegistered,

    #[error(transparent)]
    InvalidAuthority(#[from] AuthorityOutOfRange),

    #[error("file not found")]
    NotFound,

    #[error("access denied")]
    Forbidden,

    /// The identity named in a request body is not the transport caller.
    #[error("identity does not match caller")]
    IdentityMismatch,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Integrity or infrastructure failure. Never recovered locally.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type VaultResult<T> = Result<T, VaultError>;

impl VaultError {
    pub fn is_internal(&self) -> bool {
        matches!(self, VaultError::Internal(_))
    }
}

impl From<StorageError> for VaultError {
    fn from(e: StorageError) -> Self {
        VaultError::Internal(e.to_string())
    }
}

impl From<EscrowError> for VaultError {
    fn from(e: EscrowError) -> Self {
        match e {
            EscrowError::InvalidTransportKey => VaultError::InvalidRequest(e.to_string()),
            other => VaultError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_internal_is_internal() {
        assert!(VaultError::Internal("x".into()).is_internal());
        assert!(!VaultError::Forbidden.is_internal());
        assert!(!VaultError::NotFound.is_internal());
        assert!(!VaultError::InvalidCredentials.is_internal());
        assert!(!VaultError::IdentityMismatch.is_internal());
    }

    #[test]
    fn escrow_errors_split_by_cause() {
        assert!(matches!(
            VaultError::from(EscrowError::InvalidTransportKey),
            VaultError::InvalidRequest(_)
        ));
        assert!(VaultError::from(EscrowError::Open).is_internal());
    }

    #[test]
    fn authority_error_keeps_value() {
        let err = VaultError::from(AuthorityOutOfRange(300));
        assert_eq!(err.to_string(), "authority level 300 is outside 0-255");
    }
}
