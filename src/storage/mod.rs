// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent state for the vault: accounts, files, escrowed keys and the
//! audit log, all in one redb database.
//!
//! ## Storage Layout
//!
//! ```text
//! {DATA_DIR}/
//!   vault.redb    # all tables (see vault_db)
//!   escrow.key    # master key for sealing content keys
//! ```
//!
//! Without a data directory the database runs on redb's in-memory backend.

pub mod audit;
pub mod error;
pub mod paths;
pub mod records;
pub mod vault_db;

pub use audit::{AuditAction, AuditEvent, AuditStatus, LogEntry, LogOrder};
pub use error::{StorageError, StorageResult};
pub use paths::StoragePaths;
pub use records::{Account, FileMetadata, KeyRecord};
pub use vault_db::{VaultDatabase, VaultSnapshot, VaultTxn};
