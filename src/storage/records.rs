// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted records for accounts, files and escrowed keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthorityLevel, Identity, PasswordVerifier};

/// A registered account, bound to exactly one identity and one user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub identity: Identity,
    /// Human-readable handle, unique across accounts.
    pub user_id: String,
    pub verifier: PasswordVerifier,
    pub authority: AuthorityLevel,
    pub registered_at: DateTime<Utc>,
}

/// Metadata for a stored file. The ciphertext itself lives in its own table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileMetadata {
    pub title: String,
    /// Weakest authority level still allowed to read.
    pub required_authority: AuthorityLevel,
    pub owner: Identity,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
}

/// Escrowed content key for one file, sealed under the service master key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyRecord {
    pub title: String,
    pub sealed_key: Vec<u8>,
    pub created_at: DateTime<Utc>,
}
