// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-caller key wrapping over X25519.
//!
//! The service generates an ephemeral X25519 key, agrees a shared secret with
//! the caller's transport public key, expands it with HKDF-SHA256 and seals
//! the content keys with ChaCha20-Poly1305. Only the holder of the transport
//! private key can reproduce the agreement.
//!
//! Wire format: ephemeral public key (32) || nonce (12) || ciphertext + tag

use ring::aead::{LessSafeKey, UnboundKey, CHACHA20_POLY1305};
use ring::agreement::{agree_ephemeral, EphemeralPrivateKey, UnparsedPublicKey, X25519};
use ring::hkdf;
use ring::rand::SystemRandom;

use super::{cipher, ContentKey, EscrowError, EscrowResult, CONTENT_KEY_LEN};

/// Length of an X25519 public key.
pub const TRANSPORT_KEY_LEN: usize = 32;

/// Salt for HKDF key derivation (domain separation)
const HKDF_SALT: &[u8] = b"authority-vault-transport-wrap-v1";

/// Info string for HKDF key derivation (purpose binding)
const HKDF_INFO: &[u8] = b"authority-vault-escrowed-content-keys";

/// A caller's X25519 transport public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportPublicKey([u8; TRANSPORT_KEY_LEN]);

impl TransportPublicKey {
    pub fn as_bytes(&self) -> &[u8; TRANSPORT_KEY_LEN] {
        &self.0
    }
}

impl TryFrom<&[u8]> for TransportPublicKey {
    type Error = EscrowError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        <[u8; TRANSPORT_KEY_LEN]>::try_from(bytes)
            .map(TransportPublicKey)
            .map_err(|_| EscrowError::InvalidTransportKey)
    }
}

/// Seal `keys` so that only the holder of `recipient`'s private key can open
/// them.
pub(super) fn wrap(
    rng: &SystemRandom,
    recipient: &TransportPublicKey,
    keys: &[ContentKey],
) -> EscrowResult<Vec<u8>> {
    let ephemeral = EphemeralPrivateKey::generate(&X25519, rng).map_err(|_| EscrowError::Random)?;
    let ephemeral_public = ephemeral
        .compute_public_key()
        .map_err(|_| EscrowError::Random)?;

    let peer = UnparsedPublicKey::new(&X25519, recipient.as_bytes());
    let key = agree_ephemeral(ephemeral, &peer, |shared| {
        derive_wrapping_key(shared, ephemeral_public.as_ref(), recipient.as_bytes())
    })
    .map_err(|_| EscrowError::InvalidTransportKey)??;

    let mut payload = Vec::with_capacity(keys.len() * CONTENT_KEY_LEN);
    for content_key in keys {
        payload.extend_from_slice(content_key.as_bytes());
    }

    let sealed = cipher::seal(&key, rng, ephemeral_public.as_ref(), &payload)?;

    let mut blob = Vec::with_capacity(TRANSPORT_KEY_LEN + sealed.len());
    blob.extend_from_slice(ephemeral_public.as_ref());
    blob.extend_from_slice(&sealed);
    Ok(blob)
}

/// Open a blob produced by the escrow with the caller's transport private
/// key, returning the content keys in request order.
///
/// This is the caller-side half of the exchange.
pub fn open_escrowed_keys(
    private_key: EphemeralPrivateKey,
    blob: &[u8],
) -> EscrowResult<Vec<ContentKey>> {
    if blob.len() < TRANSPORT_KEY_LEN {
        return Err(EscrowError::Malformed("wrapped key blob too short"));
    }
    let (ephemeral_public, sealed) = blob.split_at(TRANSPORT_KEY_LEN);

    let own_public = private_key
        .compute_public_key()
        .map_err(|_| EscrowError::InvalidTransportKey)?;

    let peer = UnparsedPublicKey::new(&X25519, ephemeral_public);
    let key = agree_ephemeral(private_key, &peer, |shared| {
        derive_wrapping_key(shared, ephemeral_public, own_public.as_ref())
    })
    .map_err(|_| EscrowError::Malformed("bad ephemeral key"))??;

    let payload = cipher::open(&key, ephemeral_public, sealed)?;
    if payload.len() % CONTENT_KEY_LEN != 0 {
        return Err(EscrowError::Malformed("payload is not a whole number of keys"));
    }

    payload
        .chunks_exact(CONTENT_KEY_LEN)
        .map(ContentKey::try_from)
        .collect()
}

fn derive_wrapping_key(
    shared_secret: &[u8],
    ephemeral_public: &[u8],
    recipient_public: &[u8],
) -> EscrowResult<LessSafeKey> {
    let prk = hkdf::Salt::new(hkdf::HKDF_SHA256, HKDF_SALT).extract(shared_secret);
    let info = [HKDF_INFO, ephemeral_public, recipient_public];
    let okm = prk
        .expand(&info, &CHACHA20_POLY1305)
        .map_err(|_| EscrowError::Seal)?;
    Ok(LessSafeKey::new(UnboundKey::from(okm)))
}
