// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Key Escrow
//!
//! Each stored file has one 256-bit content key. The key is kept sealed under
//! the service master key (AAD = file title) and is only ever released
//! re-wrapped to a caller's X25519 transport key, after the same
//! [`can_read`](crate::auth::can_read) check that gates the ciphertext.
//!
//! ## Security Model
//!
//! - The master key never leaves the process and is never exposed via API
//! - A sealed key record is bound to its title; moving it to another file
//!   fails authentication
//! - Released keys are readable only by the holder of the transport private
//!   key named in the request
//! - This module does not encrypt file bytes; callers do that themselves

mod cipher;
pub mod transport;

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use ring::aead::{LessSafeKey, UnboundKey, CHACHA20_POLY1305};
use ring::rand::{SecureRandom, SystemRandom};

pub use transport::{open_escrowed_keys, TransportPublicKey, TRANSPORT_KEY_LEN};

/// Content and master key length in bytes.
pub const CONTENT_KEY_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum EscrowError {
    #[error("system random source failed")]
    Random,

    #[error("sealing failed")]
    Seal,

    #[error("sealed key failed authentication")]
    Open,

    #[error("malformed escrow data: {0}")]
    Malformed(&'static str),

    #[error("invalid transport public key")]
    InvalidTransportKey,

    #[error("invalid master key")]
    InvalidMasterKey,

    #[error("master key I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EscrowResult<T> = Result<T, EscrowError>;

/// A 256-bit symmetric content key.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentKey([u8; CONTENT_KEY_LEN]);

impl ContentKey {
    pub fn from_bytes(bytes: [u8; CONTENT_KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; CONTENT_KEY_LEN] {
        &self.0
    }
}

impl TryFrom<&[u8]> for ContentKey {
    type Error = EscrowError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        <[u8; CONTENT_KEY_LEN]>::try_from(bytes)
            .map(ContentKey)
            .map_err(|_| EscrowError::Malformed("content key must be 32 bytes"))
    }
}

impl std::fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContentKey(..)")
    }
}

/// Service-side escrow holding the master key.
pub struct KeyEscrow {
    master: LessSafeKey,
    rng: SystemRandom,
}

impl KeyEscrow {
    /// Build an escrow from raw master key bytes.
    pub fn from_master_key(bytes: &[u8]) -> EscrowResult<Self> {
        if bytes.len() != CONTENT_KEY_LEN {
            return Err(EscrowError::InvalidMasterKey);
        }
        let unbound =
            UnboundKey::new(&CHACHA20_POLY1305, bytes).map_err(|_| EscrowError::InvalidMasterKey)?;
        Ok(Self {
            master: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Escrow with a fresh master key that is never persisted.
    pub fn ephemeral() -> EscrowResult<Self> {
        let rng = SystemRandom::new();
        let mut bytes = [0u8; CONTENT_KEY_LEN];
        rng.fill(&mut bytes).map_err(|_| EscrowError::Random)?;
        Self::from_master_key(&bytes)
    }

    /// Load the master key from `path`, generating and writing one first if
    /// the file does not exist.
    pub fn load_or_create(path: &Path) -> EscrowResult<Self> {
        if path.exists() {
            let bytes = fs::read(path)?;
            return Self::from_master_key(&bytes);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let rng = SystemRandom::new();
        let mut bytes = [0u8; CONTENT_KEY_LEN];
        rng.fill(&mut bytes).map_err(|_| EscrowError::Random)?;

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;

        tracing::info!(path = %path.display(), "generated new escrow master key");
        Self::from_master_key(&bytes)
    }

    /// Generate a fresh random content key.
    pub fn generate_content_key(&self) -> EscrowResult<ContentKey> {
        let mut bytes = [0u8; CONTENT_KEY_LEN];
        self.rng.fill(&mut bytes).map_err(|_| EscrowError::Random)?;
        Ok(ContentKey(bytes))
    }

    /// Seal a content key for storage as the key record of `title`.
    pub fn seal_content_key(&self, title: &str, key: &ContentKey) -> EscrowResult<Vec<u8>> {
        cipher::seal(&self.master, &self.rng, title.as_bytes(), key.as_bytes())
    }

    /// Recover the content key from the sealed key record of `title`.
    pub fn unseal_content_key(&self, title: &str, sealed: &[u8]) -> EscrowResult<ContentKey> {
        let bytes = cipher::open(&self.master, title.as_bytes(), sealed)?;
        ContentKey::try_from(bytes.as_slice())
    }

    /// Re-wrap content keys for the holder of `recipient`'s private key.
    pub fn wrap_for_transport(
        &self,
        recipient: &TransportPublicKey,
        keys: &[ContentKey],
    ) -> EscrowResult<Vec<u8>> {
        transport::wrap(&self.rng, recipient, keys)
    }
}
