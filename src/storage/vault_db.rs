// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded vault database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `accounts`: identity → serialized Account
//! - `user_ids`: user_id → identity (uniqueness index)
//! - `files`: title → serialized FileMetadata
//! - `file_content`: title → raw ciphertext bytes
//! - `key_records`: title → serialized KeyRecord
//! - `audit_log`: sequence → serialized LogEntry
//!
//! ## Consistency
//!
//! redb runs one write transaction at a time and gives readers a snapshot,
//! so a file, its ciphertext and its key record become visible together or
//! not at all, and concurrent uploads to one title resolve in commit order.
//! A [`VaultSnapshot`] never waits on the writer.

use std::path::Path;

use redb::{
    backends::InMemoryBackend, Database, ReadTransaction, ReadableDatabase, ReadableTable,
    TableDefinition, WriteTransaction,
};
use serde::{de::DeserializeOwned, Serialize};

use super::audit::{self, AuditEvent, LogEntry, LogOrder};
use super::records::{Account, FileMetadata, KeyRecord};
use super::StorageResult;
use crate::auth::Identity;

// =============================================================================
// Table Definitions
// =============================================================================

const ACCOUNTS: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");

const USER_IDS: TableDefinition<&str, &str> = TableDefinition::new("user_ids");

const FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("files");

const FILE_CONTENT: TableDefinition<&str, &[u8]> = TableDefinition::new("file_content");

const KEY_RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("key_records");

const AUDIT_LOG: TableDefinition<u64, &[u8]> = TableDefinition::new("audit_log");

type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;

// =============================================================================
// VaultDatabase
// =============================================================================

/// Embedded ACID store for all vault state.
pub struct VaultDatabase {
    db: Database,
}

impl VaultDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::initialize(Database::create(path)?)
    }

    /// Create a database that lives only in memory.
    pub fn in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(InMemoryBackend::new())?;
        Self::initialize(db)
    }

    fn initialize(db: Database) -> StorageResult<Self> {
        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ACCOUNTS)?;
            let _ = write_txn.open_table(USER_IDS)?;
            let _ = write_txn.open_table(FILES)?;
            let _ = write_txn.open_table(FILE_CONTENT)?;
            let _ = write_txn.open_table(KEY_RECORDS)?;
            let _ = write_txn.open_table(AUDIT_LOG)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Start the single write transaction. Blocks while another is open.
    pub fn begin_write(&self) -> StorageResult<VaultTxn> {
        Ok(VaultTxn {
            txn: self.db.begin_write()?,
        })
    }

    /// Open a consistent read-only view of the committed state.
    pub fn snapshot(&self) -> StorageResult<VaultSnapshot> {
        Ok(VaultSnapshot {
            txn: self.db.begin_read()?,
        })
    }

    /// Snapshot lookup: is an account bound to `identity`?
    pub fn is_registered(&self, identity: &Identity) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCOUNTS)?;
        let found = table.get(identity.as_str())?.is_some();
        Ok(found)
    }

    /// Read up to `limit` audit entries in the requested order.
    pub fn read_logs(&self, limit: usize, order: LogOrder) -> StorageResult<Vec<LogEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUDIT_LOG)?;
        audit::read_entries(&table, limit, order)
    }

    /// Verify that every table can be opened for reading.
    pub fn health_check(&self) -> StorageResult<()> {
        let read_txn = self.db.begin_read()?;
        read_txn.open_table(ACCOUNTS)?;
        read_txn.open_table(USER_IDS)?;
        read_txn.open_table(FILES)?;
        read_txn.open_table(FILE_CONTENT)?;
        read_txn.open_table(KEY_RECORDS)?;
        read_txn.open_table(AUDIT_LOG)?;
        Ok(())
    }
}

// =============================================================================
// VaultSnapshot
// =============================================================================

/// A read transaction over the vault tables.
pub struct VaultSnapshot {
    txn: ReadTransaction,
}

impl VaultSnapshot {
    pub fn account(&self, identity: &Identity) -> StorageResult<Option<Account>> {
        read_json(&self.txn.open_table(ACCOUNTS)?, identity.as_str())
    }

    pub fn file_metadata(&self, title: &str) -> StorageResult<Option<FileMetadata>> {
        read_json(&self.txn.open_table(FILES)?, title)
    }

    pub fn file_content(&self, title: &str) -> StorageResult<Option<Vec<u8>>> {
        read_bytes(&self.txn.open_table(FILE_CONTENT)?, title)
    }

    pub fn key_record(&self, title: &str) -> StorageResult<Option<KeyRecord>> {
        read_json(&self.txn.open_table(KEY_RECORDS)?, title)
    }
}

// =============================================================================
// VaultTxn
// =============================================================================

/// A write transaction over the vault tables.
///
/// Dropping it without [`VaultTxn::commit`] discards every change.
pub struct VaultTxn {
    txn: WriteTransaction,
}

impl VaultTxn {
    pub fn account(&self, identity: &Identity) -> StorageResult<Option<Account>> {
        read_json(&self.txn.open_table(ACCOUNTS)?, identity.as_str())
    }

    pub fn user_id_taken(&self, user_id: &str) -> StorageResult<bool> {
        let table = self.txn.open_table(USER_IDS)?;
        let taken = table.get(user_id)?.is_some();
        Ok(taken)
    }

    /// Insert a new account and its user-id index entry.
    pub fn insert_account(&self, account: &Account) -> StorageResult<()> {
        let json = serde_json::to_vec(account)?;
        {
            let mut accounts = self.txn.open_table(ACCOUNTS)?;
            accounts.insert(account.identity.as_str(), json.as_slice())?;
        }
        let mut user_ids = self.txn.open_table(USER_IDS)?;
        user_ids.insert(account.user_id.as_str(), account.identity.as_str())?;
        Ok(())
    }

    pub fn file_metadata(&self, title: &str) -> StorageResult<Option<FileMetadata>> {
        read_json(&self.txn.open_table(FILES)?, title)
    }

    pub fn file_content(&self, title: &str) -> StorageResult<Option<Vec<u8>>> {
        read_bytes(&self.txn.open_table(FILE_CONTENT)?, title)
    }

    pub fn key_record(&self, title: &str) -> StorageResult<Option<KeyRecord>> {
        read_json(&self.txn.open_table(KEY_RECORDS)?, title)
    }

    /// Insert or replace a file together with its ciphertext and key record.
    pub fn put_file(
        &self,
        metadata: &FileMetadata,
        content: &[u8],
        key_record: &KeyRecord,
    ) -> StorageResult<()> {
        let title = metadata.title.as_str();
        self.put_json(FILES, title, metadata)?;
        {
            let mut table = self.txn.open_table(FILE_CONTENT)?;
            table.insert(title, content)?;
        }
        self.put_json(KEY_RECORDS, title, key_record)
    }

    /// Append an audit entry, assigning its sequence and timestamp.
    pub fn append_log(&self, event: AuditEvent) -> StorageResult<LogEntry> {
        let mut table = self.txn.open_table(AUDIT_LOG)?;
        audit::append(&mut table, event)
    }

    pub fn commit(self) -> StorageResult<()> {
        self.txn.commit()?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn remove_key_record(&self, title: &str) -> StorageResult<()> {
        let mut table = self.txn.open_table(KEY_RECORDS)?;
        table.remove(title)?;
        Ok(())
    }

    fn put_json<T: Serialize>(
        &self,
        definition: JsonTable,
        key: &str,
        value: &T,
    ) -> StorageResult<()> {
        let json = serde_json::to_vec(value)?;
        let mut table = self.txn.open_table(definition)?;
        table.insert(key, json.as_slice())?;
        Ok(())
    }
}

fn read_json<T, R>(table: &R, key: &str) -> StorageResult<Option<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static [u8]>,
{
    let record = match table.get(key)? {
        Some(value) => Some(serde_json::from_slice(value.value())?),
        None => None,
    };
    Ok(record)
}

fn read_bytes<R>(table: &R, key: &str) -> StorageResult<Option<Vec<u8>>>
where
    R: ReadableTable<&'static str, &'static [u8]>,
{
    let bytes = table.get(key)?.map(|value| value.value().to_vec());
    Ok(bytes)
}
