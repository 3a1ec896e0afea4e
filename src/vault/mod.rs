// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Vault Service Core
//!
//! The vault ties the identity gate, access control, file store, key escrow
//! and audit log together behind one object:
//!
//! - `accounts` - registration and login
//! - `files` - authority-gated upload and read
//! - `keys` - content key release to authorized callers
//!
//! ## Audit Guarantee
//!
//! Every register, login, upload, read and key request appends exactly one
//! audit entry before returning. Register and upload decide and write inside
//! one write transaction, and their entry commits with the change. Login,
//! read and key requests decide on a read snapshot and then take the write
//! lock only to append their entry. Password hashing and verification never
//! run while the write lock is held. Internal failures are recorded with
//! status `error` in a fresh transaction.

mod accounts;
pub mod error;
mod files;
mod keys;

pub use accounts::{login_event, register_event};
pub use files::{read_event, upload_event};
pub use keys::key_request_event;

use std::num::NonZeroU32;
use std::path::Path;

use ring::rand::SystemRandom;

use crate::auth::Identity;
use crate::config::VaultConfig;
use crate::escrow::KeyEscrow;
use crate::storage::{
    AuditEvent, LogEntry, LogOrder, StoragePaths, VaultDatabase, VaultSnapshot, VaultTxn,
};

pub use error::{VaultError, VaultResult};

/// The access-controlled file store with key escrow and audit log.
pub struct Vault {
    db: VaultDatabase,
    escrow: KeyEscrow,
    hash_iterations: NonZeroU32,
    rng: SystemRandom,
}

impl Vault {
    pub fn new(db: VaultDatabase, escrow: KeyEscrow, hash_iterations: NonZeroU32) -> Self {
        Self {
            db,
            escrow,
            hash_iterations,
            rng: SystemRandom::new(),
        }
    }

    /// Open a persistent vault under `data_dir`.
    pub fn open(data_dir: &Path, hash_iterations: NonZeroU32) -> VaultResult<Self> {
        let paths = StoragePaths::new(data_dir);
        let db = VaultDatabase::open(&paths.database())?;
        let escrow = KeyEscrow::load_or_create(&paths.escrow_key())?;
        tracing::info!(data_dir = %paths.root().display(), "opened persistent vault");
        Ok(Self::new(db, escrow, hash_iterations))
    }

    /// Vault whose state and master key vanish with the process.
    pub fn in_memory(hash_iterations: NonZeroU32) -> VaultResult<Self> {
        let db = VaultDatabase::in_memory()?;
        let escrow = KeyEscrow::ephemeral()?;
        Ok(Self::new(db, escrow, hash_iterations))
    }

    pub fn from_config(config: &VaultConfig) -> VaultResult<Self> {
        match &config.data_dir {
            Some(dir) => Self::open(dir, config.hash_iterations),
            None => {
                tracing::warn!("DATA_DIR not set, vault state will not survive restart");
                Self::in_memory(config.hash_iterations)
            }
        }
    }

    /// Pure lookup used for UI branching. Not audited.
    pub fn is_registered(&self, identity: &Identity) -> VaultResult<bool> {
        Ok(self.db.is_registered(identity)?)
    }

    /// Read up to `limit` audit entries, newest or oldest first.
    pub fn read_logs(&self, limit: usize, order: LogOrder) -> VaultResult<Vec<LogEntry>> {
        Ok(self.db.read_logs(limit, order)?)
    }

    pub fn health_check(&self) -> VaultResult<()> {
        Ok(self.db.health_check()?)
    }

    /// Record `err` as a denial of `event` and hand it back.
    ///
    /// Used for requests turned away before any vault state is consulted.
    pub fn reject(&self, event: AuditEvent, err: VaultError) -> VaultError {
        match self.append(event.clone().denied(&err)) {
            Ok(()) => err,
            Err(e) => self.fail(event, e),
        }
    }

    /// Run `op` in a write transaction and append its audit entry.
    ///
    /// A denial is committed together with its log entry; `op` must not
    /// write before deciding to deny. An internal error rolls back `op`.
    fn audited<T>(
        &self,
        event: AuditEvent,
        op: impl FnOnce(&VaultTxn) -> VaultResult<T>,
    ) -> VaultResult<T> {
        let txn = match self.db.begin_write() {
            Ok(txn) => txn,
            Err(e) => return Err(self.fail(event, e.into())),
        };

        let result = match op(&txn) {
            Err(err) if err.is_internal() => {
                drop(txn);
                return Err(self.fail(event, err));
            }
            other => other,
        };

        let entry = match &result {
            Ok(_) => event.clone(),
            Err(err) => event.clone().denied(err),
        };

        let logged = match txn.append_log(entry) {
            Ok(_) => txn.commit().map_err(VaultError::from),
            Err(e) => {
                drop(txn);
                Err(e.into())
            }
        };
        if let Err(err) = logged {
            return Err(self.fail(event, err));
        }

        result
    }

    /// Decide `op` on a read snapshot, then append its audit entry.
    ///
    /// The snapshot is released before the write lock is taken.
    fn observed<T>(
        &self,
        event: AuditEvent,
        op: impl FnOnce(&VaultSnapshot) -> VaultResult<T>,
    ) -> VaultResult<T> {
        let outcome = self
            .db
            .snapshot()
            .map_err(VaultError::from)
            .and_then(|snapshot| op(&snapshot));
        self.settle(event, outcome)
    }

    /// Append the audit entry for an outcome decided outside any write
    /// transaction. The value is withheld if the entry cannot be written.
    fn settle<T>(&self, event: AuditEvent, outcome: VaultResult<T>) -> VaultResult<T> {
        match outcome {
            Err(err) if err.is_internal() => Err(self.fail(event, err)),
            Err(err) => Err(self.reject(event, err)),
            Ok(value) => match self.append(event.clone()) {
                Ok(()) => Ok(value),
                Err(e) => Err(self.fail(event, e)),
            },
        }
    }

    fn append(&self, entry: AuditEvent) -> VaultResult<()> {
        let txn = self.db.begin_write()?;
        txn.append_log(entry)?;
        txn.commit()?;
        Ok(())
    }

    /// Report an internal failure loudly and record it with status `error`.
    fn fail(&self, event: AuditEvent, err: VaultError) -> VaultError {
        tracing::error!(
            action = ?event.action,
            actor = %event.actor,
            error = %err,
            "vault operation failed"
        );

        let recorded = self.db.begin_write().and_then(|txn| {
            txn.append_log(event.failed(&err))?;
            txn.commit()
        });
        if let Err(e) = recorded {
            tracing::error!(error = %e, "could not record failure in audit log");
        }

        err
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::escrow::TransportPublicKey;
    use ring::agreement::{EphemeralPrivateKey, X25519};

    pub(crate) fn vault() -> Vault {
        Vault::in_memory(NonZeroU32::new(1).unwrap()).unwrap()
    }

    pub(crate) fn transport_keypair() -> (EphemeralPrivateKey, TransportPublicKey) {
        let rng = SystemRandom::new();
        let private_key = EphemeralPrivateKey::generate(&X25519, &rng).unwrap();
        let public = private_key.compute_public_key().unwrap();
        (private_key, TransportPublicKey::try_from(public.as_ref()).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{transport_keypair, vault};
    use super::*;
    use crate::escrow::open_escrowed_keys;
    use crate::storage::{AuditAction, AuditStatus};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn p(name: &str) -> Identity {
        Identity::from(name)
    }

    fn last_entry(vault: &Vault) -> LogEntry {
        vault.read_logs(1, LogOrder::Recent).unwrap().remove(0)
    }

    #[test]
    fn end_to_end_scenario() {
        let vault = vault();

        vault.register(&p("P1"), "alice", "x", 10).unwrap();
        assert!(matches!(
            vault.register(&p("P1"), "alice2", "y", 20),
            Err(VaultError::AlreadyRegistered)
        ));

        assert!(vault.authenticate(&p("P1"), "alice", "x").unwrap());
        assert!(!vault.authenticate(&p("P1"), "alice", "wrong").unwrap());
        let denied = last_entry(&vault);
        assert_eq!(denied.action, AuditAction::Login);
        assert_eq!(denied.status, AuditStatus::Denied);

        vault.upload(&p("P1"), "doc1", b"ciphertext", 50, None).unwrap();
        assert_eq!(vault.read("doc1", &p("P1")).unwrap(), b"ciphertext");

        vault.register(&p("P2"), "bob", "pw", 100).unwrap();
        assert!(matches!(vault.read("doc1", &p("P2")), Err(VaultError::Forbidden)));
    }

    #[test]
    fn every_audited_call_appends_exactly_one_entry() {
        let vault = vault();
        let mut expected = 0;
        let mut check = |action: AuditAction, status: AuditStatus| {
            expected += 1;
            let logs = vault.read_logs(usize::MAX, LogOrder::Oldest).unwrap();
            assert_eq!(logs.len(), expected);
            let entry = logs.last().unwrap();
            assert_eq!((entry.action, entry.status), (action, status));
        };

        vault.register(&p("P1"), "alice", "x", 10).unwrap();
        check(AuditAction::Register, AuditStatus::Success);
        let _ = vault.register(&p("P1"), "again", "x", 10);
        check(AuditAction::Register, AuditStatus::Denied);
        let _ = vault.register(&p("P9"), "nine", "x", 256);
        check(AuditAction::Register, AuditStatus::Denied);

        vault.authenticate(&p("P1"), "alice", "x").unwrap();
        check(AuditAction::Login, AuditStatus::Success);
        vault.authenticate(&p("P7"), "ghost", "x").unwrap();
        check(AuditAction::Login, AuditStatus::Denied);

        vault.upload(&p("P1"), "doc1", b"c", 50, None).unwrap();
        check(AuditAction::Upload, AuditStatus::Success);
        let _ = vault.upload(&p("P7"), "doc2", b"c", 50, None);
        check(AuditAction::Upload, AuditStatus::Denied);

        vault.read("doc1", &p("P1")).unwrap();
        check(AuditAction::Read, AuditStatus::Success);
        let _ = vault.read("missing", &p("P1"));
        check(AuditAction::Read, AuditStatus::Denied);

        let (_, public) = transport_keypair();
        vault.get_encrypted_key(&p("P1"), &[b"doc1".to_vec()], &public).unwrap();
        check(AuditAction::KeyRequest, AuditStatus::Success);

        // Lookups and log reads are not audited.
        vault.is_registered(&p("P1")).unwrap();
        vault.read_logs(10, LogOrder::Recent).unwrap();
        assert_eq!(vault.read_logs(usize::MAX, LogOrder::Oldest).unwrap().len(), expected);
    }

    #[test]
    fn login_log_never_contains_password() {
        let vault = vault();
        vault.register(&p("P1"), "alice", "s3cret-pw", 10).unwrap();
        vault.authenticate(&p("P1"), "alice", "s3cret-pw").unwrap();
        vault.authenticate(&p("P1"), "alice", "guess-pw").unwrap();

        for entry in vault.read_logs(usize::MAX, LogOrder::Oldest).unwrap() {
            assert!(!entry.details.contains("s3cret-pw"));
            assert!(!entry.details.contains("guess-pw"));
        }
    }

    #[test]
    fn recent_logs_return_last_three_descending() {
        let vault = vault();
        for n in 0..5 {
            vault.authenticate(&p(&format!("P{n}")), "u", "pw").unwrap();
        }

        let all = vault.read_logs(5, LogOrder::Oldest).unwrap();
        let recent = vault.read_logs(3, LogOrder::Recent).unwrap();
        assert_eq!(recent, vec![all[4].clone(), all[3].clone(), all[2].clone()]);
    }

    #[test]
    fn concurrent_overwrites_never_tear() {
        let vault = Arc::new(vault());
        vault.register(&p("P1"), "alice", "x", 0).unwrap();
        let a = vec![b'a'; 4096];
        let b = vec![b'b'; 4096];

        let writers: Vec<_> = [a.clone(), b.clone()]
            .into_iter()
            .map(|content| {
                let vault = Arc::clone(&vault);
                thread::spawn(move || {
                    for _ in 0..20 {
                        vault.upload(&p("P1"), "shared", &content, 10, None).unwrap();
                    }
                })
            })
            .collect();

        let reader = {
            let vault = Arc::clone(&vault);
            let (a, b) = (a.clone(), b.clone());
            thread::spawn(move || {
                for _ in 0..40 {
                    match vault.read("shared", &p("P1")) {
                        Ok(content) => assert!(content == a || content == b),
                        Err(VaultError::NotFound) => {}
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                }
            })
        };

        for handle in writers {
            handle.join().unwrap();
        }
        reader.join().unwrap();

        let logs = vault.read_logs(usize::MAX, LogOrder::Oldest).unwrap();
        for pair in logs.windows(2) {
            assert_eq!(pair[1].sequence, pair[0].sequence + 1);
            assert!(pair[1].timestamp > pair[0].timestamp);
        }
    }

    #[test]
    fn reads_and_logins_do_not_wait_on_password_hashing() {
        let mut vault = vault();
        vault.register(&p("P1"), "alice", "x", 0).unwrap();
        vault.upload(&p("P1"), "doc1", b"ciphertext", 0, None).unwrap();
        vault.hash_iterations = NonZeroU32::new(500_000).unwrap();
        let vault = Arc::new(vault);

        let registration = {
            let vault = Arc::clone(&vault);
            thread::spawn(move || vault.register(&p("P2"), "bob", "slow", 10))
        };
        thread::sleep(Duration::from_millis(10));

        let (_, public) = transport_keypair();
        for _ in 0..5 {
            assert_eq!(vault.read("doc1", &p("P1")).unwrap(), b"ciphertext");
            assert!(vault.authenticate(&p("P1"), "alice", "x").unwrap());
            vault.get_encrypted_key(&p("P1"), &[b"doc1".to_vec()], &public).unwrap();
        }
        assert!(
            !registration.is_finished(),
            "reads waited for a registration to finish hashing"
        );

        registration.join().unwrap().unwrap();
        assert!(vault.is_registered(&p("P2")).unwrap());
    }

    #[test]
    fn rejection_is_logged_as_denied() {
        let vault = vault();
        let err = vault.reject(
            read_event(&p("mallory"), "doc1"),
            VaultError::IdentityMismatch,
        );
        assert!(matches!(err, VaultError::IdentityMismatch));

        let entry = last_entry(&vault);
        assert_eq!(entry.action, AuditAction::Read);
        assert_eq!(entry.status, AuditStatus::Denied);
        assert_eq!(entry.actor.as_str(), "mallory");
        assert_eq!(entry.details, "title=doc1: identity does not match caller");
    }

    #[test]
    fn persistent_vault_keeps_files_and_keys() {
        let temp = TempDir::new().unwrap();
        let iterations = NonZeroU32::new(1).unwrap();
        {
            let vault = Vault::open(temp.path(), iterations).unwrap();
            vault.register(&p("P1"), "alice", "x", 5).unwrap();
            vault.upload(&p("P1"), "doc1", b"persisted", 5, None).unwrap();
        }

        let vault = Vault::open(temp.path(), iterations).unwrap();
        assert!(vault.is_registered(&p("P1")).unwrap());
        assert!(vault.authenticate(&p("P1"), "alice", "x").unwrap());
        assert_eq!(vault.read("doc1", &p("P1")).unwrap(), b"persisted");

        let (private_key, public) = transport_keypair();
        let blob = vault.get_encrypted_key(&p("P1"), &[b"doc1".to_vec()], &public).unwrap();
        assert_eq!(open_escrowed_keys(private_key, &blob).unwrap().len(), 1);
    }
}
