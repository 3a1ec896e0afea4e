// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authority levels for authorization.
//!
//! ## Ordering
//!
//! Authority is a single byte where **smaller is stronger**:
//!
//! - `0` - highest privilege
//! - `255` - lowest privilege
//!
//! An account holds one level; a file carries the *weakest* level still
//! allowed to read it. [`can_read`] is the only place that comparison lives.
//! The file store's read path and the key escrow both call it, so "can read
//! the ciphertext" and "can obtain the content key" never drift apart.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A validated authority level in `0..=255`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct AuthorityLevel(u8);

/// Error returned when a raw authority value falls outside `0..=255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("authority level {0} is outside 0-255")]
pub struct AuthorityOutOfRange(pub i64);

impl AuthorityLevel {
    /// Most privileged level.
    pub const HIGHEST: AuthorityLevel = AuthorityLevel(0);
    /// Least privileged level.
    pub const LOWEST: AuthorityLevel = AuthorityLevel(u8::MAX);

    pub const fn new(level: u8) -> Self {
        Self(level)
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

impl From<u8> for AuthorityLevel {
    fn from(level: u8) -> Self {
        Self(level)
    }
}

impl TryFrom<i64> for AuthorityLevel {
    type Error = AuthorityOutOfRange;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        u8::try_from(raw)
            .map(AuthorityLevel)
            .map_err(|_| AuthorityOutOfRange(raw))
    }
}

impl std::fmt::Display for AuthorityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Decide whether an account may read a file.
///
/// Admits the caller iff `account <= required`: the account is at least as
/// privileged as the weakest level the file allows.
pub fn can_read(account: AuthorityLevel, required: AuthorityLevel) -> bool {
    account.0 <= required.0
}
