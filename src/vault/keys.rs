// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Content key release.

use super::{Vault, VaultError, VaultResult};
use crate::auth::{can_read, Identity};
use crate::escrow::TransportPublicKey;
use crate::storage::{AuditAction, AuditEvent};

pub fn key_request_event<S: AsRef<str>>(caller: &Identity, titles: &[S]) -> AuditEvent {
    let listed: Vec<&str> = titles.iter().map(AsRef::as_ref).collect();
    AuditEvent::new(AuditAction::KeyRequest, caller)
        .with_details(format!("titles={}", listed.join(",")))
}

impl Vault {
    /// Release the content keys of the files named by `file_refs`, wrapped to
    /// `transport`.
    ///
    /// All or nothing: if the caller may not read any one of the files the
    /// whole request is `Forbidden`. Unknown titles are indistinguishable
    /// from unreadable ones. The decision and the unwrapping happen on one
    /// read snapshot.
    pub fn get_encrypted_key(
        &self,
        caller: &Identity,
        file_refs: &[Vec<u8>],
        transport: &TransportPublicKey,
    ) -> VaultResult<Vec<u8>> {
        let listed: Vec<_> = file_refs.iter().map(|r| String::from_utf8_lossy(r)).collect();
        let event = key_request_event(caller, &listed);

        self.observed(event, |snapshot| {
            let account = snapshot.account(caller)?.ok_or(VaultError::Forbidden)?;
            if file_refs.is_empty() {
                return Err(VaultError::Forbidden);
            }

            let mut titles = Vec::with_capacity(file_refs.len());
            for file_ref in file_refs {
                let title = std::str::from_utf8(file_ref).map_err(|_| VaultError::Forbidden)?;
                let metadata = snapshot.file_metadata(title)?.ok_or(VaultError::Forbidden)?;
                if !can_read(account.authority, metadata.required_authority) {
                    return Err(VaultError::Forbidden);
                }
                titles.push(title);
            }

            let mut keys = Vec::with_capacity(titles.len());
            for title in titles {
                let record = snapshot.key_record(title)?.ok_or_else(|| {
                    VaultError::Internal(format!("file {title} has no key record"))
                })?;
                keys.push(self.escrow.unseal_content_key(title, &record.sealed_key)?);
            }

            Ok(self.escrow.wrap_for_transport(transport, &keys)?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{transport_keypair, vault};
    use super::*;
    use crate::escrow::{open_escrowed_keys, ContentKey};
    use crate::storage::{AuditStatus, LogOrder};

    fn p(name: &str) -> Identity {
        Identity::from(name)
    }

    fn refs(titles: &[&str]) -> Vec<Vec<u8>> {
        titles.iter().map(|t| t.as_bytes().to_vec()).collect()
    }

    fn setup() -> Vault {
        let vault = vault();
        vault.register(&p("P1"), "alice", "x", 10).unwrap();
        vault.register(&p("P2"), "bob", "x", 100).unwrap();
        vault
            .upload(&p("P1"), "open", b"c", 200, Some(ContentKey::from_bytes([1; 32])))
            .unwrap();
        vault
            .upload(&p("P1"), "restricted", b"c", 50, Some(ContentKey::from_bytes([2; 32])))
            .unwrap();
        vault
    }

    #[test]
    fn keys_come_back_in_request_order() {
        let vault = setup();
        let (private_key, public) = transport_keypair();

        let blob = vault
            .get_encrypted_key(&p("P1"), &refs(&["restricted", "open"]), &public)
            .unwrap();
        let keys = open_escrowed_keys(private_key, &blob).unwrap();
        assert_eq!(
            keys,
            vec![ContentKey::from_bytes([2; 32]), ContentKey::from_bytes([1; 32])]
        );
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let vault = setup();
        let (_, public) = transport_keypair();

        vault.get_encrypted_key(&p("P2"), &refs(&["open"]), &public).unwrap();
        assert!(matches!(
            vault.get_encrypted_key(&p("P2"), &refs(&["open", "restricted"]), &public),
            Err(VaultError::Forbidden)
        ));

        let entry = &vault.read_logs(1, LogOrder::Recent).unwrap()[0];
        assert_eq!(entry.action, AuditAction::KeyRequest);
        assert_eq!(entry.status, AuditStatus::Denied);
        assert_eq!(entry.details, "titles=open,restricted: access denied");
    }

    #[test]
    fn unknown_caller_title_or_empty_batch_is_forbidden() {
        let vault = setup();
        let (_, public) = transport_keypair();

        for (caller, batch) in [
            ("ghost", refs(&["open"])),
            ("P1", refs(&["missing"])),
            ("P1", vec![vec![0xff, 0xfe]]),
            ("P1", vec![]),
        ] {
            assert!(matches!(
                vault.get_encrypted_key(&p(caller), &batch, &public),
                Err(VaultError::Forbidden)
            ));
        }
    }

    #[test]
    fn wrapped_blob_is_useless_to_other_key_holders() {
        let vault = setup();
        let (_, public) = transport_keypair();
        let (eavesdropper, _) = transport_keypair();

        let blob = vault.get_encrypted_key(&p("P1"), &refs(&["open"]), &public).unwrap();
        assert!(open_escrowed_keys(eavesdropper, &blob).is_err());
    }

    #[test]
    fn missing_key_record_is_internal_and_logged() {
        let vault = setup();
        {
            let txn = vault.db.begin_write().unwrap();
            txn.remove_key_record("open").unwrap();
            txn.commit().unwrap();
        }
        let before = vault.read_logs(usize::MAX, LogOrder::Oldest).unwrap().len();

        let (_, public) = transport_keypair();
        let err = vault
            .get_encrypted_key(&p("P1"), &refs(&["open"]), &public)
            .unwrap_err();
        assert!(err.is_internal());

        let logs = vault.read_logs(usize::MAX, LogOrder::Oldest).unwrap();
        assert_eq!(logs.len(), before + 1);
        let entry = logs.last().unwrap();
        assert_eq!(entry.status, AuditStatus::Error);
        assert!(entry.details.contains("no key record"));
    }
}
