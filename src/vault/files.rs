// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authority-gated file store.
//!
//! A file is keyed by title. Uploading to an existing title replaces its
//! ciphertext, threshold and key record in one transaction; concurrent
//! uploads resolve last-committed-wins.

use chrono::Utc;

use super::{Vault, VaultError, VaultResult};
use crate::auth::{can_read, AuthorityLevel, Identity};
use crate::escrow::ContentKey;
use crate::storage::{AuditAction, AuditEvent, FileMetadata, KeyRecord};

pub fn upload_event(caller: &Identity, title: &str, required: i64) -> AuditEvent {
    AuditEvent::new(AuditAction::Upload, caller)
        .with_details(format!("title={title} required_authority={required}"))
}

pub fn read_event(identity: &Identity, title: &str) -> AuditEvent {
    AuditEvent::new(AuditAction::Read, identity).with_details(format!("title={title}"))
}

impl Vault {
    /// Store `ciphertext` under `title`, readable by accounts at least as
    /// privileged as `required`.
    ///
    /// The file's content key is escrowed alongside it. Callers that
    /// encrypted with their own key pass it as `content_key`; otherwise a
    /// fresh key is generated and can be fetched via
    /// [`Vault::get_encrypted_key`].
    pub fn upload(
        &self,
        caller: &Identity,
        title: &str,
        ciphertext: &[u8],
        required: i64,
        content_key: Option<ContentKey>,
    ) -> VaultResult<()> {
        let event = upload_event(caller, title, required);

        self.audited(event, |txn| {
            let owner = txn.account(caller)?.ok_or(VaultError::NotAuthenticated)?;
            let required = AuthorityLevel::try_from(required)?;
            if title.is_empty() {
                return Err(VaultError::InvalidRequest("title must not be empty".into()));
            }

            let content_key = match content_key {
                Some(key) => key,
                None => self.escrow.generate_content_key()?,
            };
            let sealed_key = self.escrow.seal_content_key(title, &content_key)?;

            let now = Utc::now();
            let metadata = FileMetadata {
                title: title.to_string(),
                required_authority: required,
                owner: owner.identity,
                size: ciphertext.len() as u64,
                uploaded_at: now,
            };
            let key_record = KeyRecord {
                title: title.to_string(),
                sealed_key,
                created_at: now,
            };
            txn.put_file(&metadata, ciphertext, &key_record)?;
            Ok(())
        })?;

        tracing::info!(%caller, title, size = ciphertext.len(), "file stored");
        Ok(())
    }

    /// Return the stored ciphertext of `title` if `identity` may read it.
    ///
    /// Callers without an account get `Forbidden` whether or not the title
    /// exists.
    pub fn read(&self, title: &str, identity: &Identity) -> VaultResult<Vec<u8>> {
        self.observed(read_event(identity, title), |snapshot| {
            let account = snapshot.account(identity)?.ok_or(VaultError::Forbidden)?;
            let metadata = snapshot.file_metadata(title)?.ok_or(VaultError::NotFound)?;

            if !can_read(account.authority, metadata.required_authority) {
                return Err(VaultError::Forbidden);
            }

            snapshot
                .file_content(title)?
                .ok_or_else(|| VaultError::Internal(format!("file {title} has no content")))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{transport_keypair, vault};
    use super::*;
    use crate::escrow::open_escrowed_keys;
    use crate::storage::{AuditStatus, LogOrder};

    fn p(name: &str) -> Identity {
        Identity::from(name)
    }

    #[test]
    fn upload_requires_account() {
        let vault = vault();
        assert!(matches!(
            vault.upload(&p("P1"), "doc1", b"c", 50, None),
            Err(VaultError::NotAuthenticated)
        ));

        vault.register(&p("P2"), "bob", "x", 0).unwrap();
        assert!(matches!(vault.read("doc1", &p("P2")), Err(VaultError::NotFound)));
    }

    #[test]
    fn upload_rejects_out_of_range_threshold() {
        let vault = vault();
        vault.register(&p("P1"), "alice", "x", 0).unwrap();

        for bad in [-1, 256, 1000] {
            assert!(matches!(
                vault.upload(&p("P1"), "doc1", b"c", bad, None),
                Err(VaultError::InvalidAuthority(_))
            ));
        }
        assert!(matches!(vault.read("doc1", &p("P1")), Err(VaultError::NotFound)));

        vault.upload(&p("P1"), "doc0", b"c", 0, None).unwrap();
        vault.upload(&p("P1"), "doc255", b"c", 255, None).unwrap();
    }

    #[test]
    fn read_applies_authority_floor() {
        let vault = vault();
        vault.register(&p("P1"), "owner", "x", 0).unwrap();
        vault.register(&p("P2"), "equal", "x", 50).unwrap();
        vault.register(&p("P3"), "weaker", "x", 51).unwrap();
        vault.upload(&p("P1"), "doc1", b"secret-bytes", 50, None).unwrap();

        assert_eq!(vault.read("doc1", &p("P1")).unwrap(), b"secret-bytes");
        assert_eq!(vault.read("doc1", &p("P2")).unwrap(), b"secret-bytes");
        assert!(matches!(vault.read("doc1", &p("P3")), Err(VaultError::Forbidden)));
    }

    #[test]
    fn unregistered_reader_cannot_learn_existence() {
        let vault = vault();
        vault.register(&p("P1"), "alice", "x", 0).unwrap();
        vault.upload(&p("P1"), "doc1", b"c", 50, None).unwrap();

        assert!(matches!(vault.read("doc1", &p("ghost")), Err(VaultError::Forbidden)));
        assert!(matches!(vault.read("nope", &p("ghost")), Err(VaultError::Forbidden)));
    }

    #[test]
    fn reads_are_idempotent_and_logged_with_title() {
        let vault = vault();
        vault.register(&p("P1"), "alice", "x", 10).unwrap();
        vault.register(&p("P2"), "bob", "x", 100).unwrap();
        vault.upload(&p("P1"), "doc1", b"payload", 50, None).unwrap();

        let first = vault.read("doc1", &p("P1")).unwrap();
        let second = vault.read("doc1", &p("P1")).unwrap();
        assert_eq!(first, second);
        let _ = vault.read("doc1", &p("P2"));

        let logs = vault.read_logs(3, LogOrder::Recent).unwrap();
        assert_eq!(logs[0].status, AuditStatus::Denied);
        assert_eq!(logs[0].details, "title=doc1: access denied");
        for entry in &logs {
            assert_eq!(entry.action, AuditAction::Read);
            assert!(entry.details.starts_with("title=doc1"));
            assert!(!entry.details.contains("payload"));
        }
    }

    #[test]
    fn overwrite_replaces_content_threshold_and_key() {
        let vault = vault();
        vault.register(&p("P1"), "alice", "x", 10).unwrap();
        vault.register(&p("P2"), "bob", "x", 60).unwrap();

        let first_key = ContentKey::from_bytes([1; 32]);
        let second_key = ContentKey::from_bytes([2; 32]);
        vault.upload(&p("P1"), "doc1", b"v1", 50, Some(first_key)).unwrap();
        assert!(matches!(vault.read("doc1", &p("P2")), Err(VaultError::Forbidden)));

        vault.upload(&p("P1"), "doc1", b"v2", 100, Some(second_key.clone())).unwrap();
        assert_eq!(vault.read("doc1", &p("P2")).unwrap(), b"v2");

        let (private_key, public) = transport_keypair();
        let blob = vault.get_encrypted_key(&p("P2"), &[b"doc1".to_vec()], &public).unwrap();
        assert_eq!(open_escrowed_keys(private_key, &blob).unwrap(), vec![second_key]);
    }

    #[test]
    fn failed_upload_keeps_previous_file() {
        let vault = vault();
        vault.register(&p("P1"), "alice", "x", 10).unwrap();
        vault.upload(&p("P1"), "doc1", b"original", 50, None).unwrap();

        assert!(vault.upload(&p("P1"), "doc1", b"replacement", 300, None).is_err());
        assert_eq!(vault.read("doc1", &p("P1")).unwrap(), b"original");
    }

    #[test]
    fn empty_title_is_rejected() {
        let vault = vault();
        vault.register(&p("P1"), "alice", "x", 10).unwrap();
        assert!(matches!(
            vault.upload(&p("P1"), "", b"c", 50, None),
            Err(VaultError::InvalidRequest(_))
        ));
    }
}
