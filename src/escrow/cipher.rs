// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ChaCha20-Poly1305 sealing with a random 12-byte nonce.
//!
//! Wire format: nonce (12 bytes) || ciphertext (includes 16-byte tag)

use ring::aead::{Aad, LessSafeKey, Nonce, MAX_TAG_LEN, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};

use super::{EscrowError, EscrowResult};

pub(super) fn seal(
    key: &LessSafeKey,
    rng: &SystemRandom,
    aad: &[u8],
    plaintext: &[u8],
) -> EscrowResult<Vec<u8>> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill(&mut nonce_bytes).map_err(|_| EscrowError::Random)?;

    let mut in_out = plaintext.to_vec();
    key.seal_in_place_append_tag(
        Nonce::assume_unique_for_key(nonce_bytes),
        Aad::from(aad),
        &mut in_out,
    )
    .map_err(|_| EscrowError::Seal)?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&in_out);
    Ok(sealed)
}

pub(super) fn open(key: &LessSafeKey, aad: &[u8], sealed: &[u8]) -> EscrowResult<Vec<u8>> {
    if sealed.len() < NONCE_LEN + MAX_TAG_LEN {
        return Err(EscrowError::Malformed("sealed data too short"));
    }

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
        .map_err(|_| EscrowError::Malformed("bad nonce"))?;

    let mut in_out = ciphertext.to_vec();
    let plaintext = key
        .open_in_place(nonce, Aad::from(aad), &mut in_out)
        .map_err(|_| EscrowError::Open)?;
    Ok(plaintext.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ring::aead::{UnboundKey, CHACHA20_POLY1305};

    fn key(byte: u8) -> LessSafeKey {
        LessSafeKey::new(UnboundKey::new(&CHACHA20_POLY1305, &[byte; 32]).unwrap())
    }

    #[test]
    fn seal_then_open() {
        let rng = SystemRandom::new();
        let sealed = seal(&key(1), &rng, b"aad", b"secret").unwrap();
        assert_eq!(sealed.len(), NONCE_LEN + 6 + MAX_TAG_LEN);
        assert_eq!(open(&key(1), b"aad", &sealed).unwrap(), b"secret");
    }

    #[test]
    fn wrong_key_or_aad_fails() {
        let rng = SystemRandom::new();
        let sealed = seal(&key(1), &rng, b"aad", b"secret").unwrap();
        assert!(matches!(open(&key(2), b"aad", &sealed), Err(EscrowError::Open)));
        assert!(matches!(open(&key(1), b"other", &sealed), Err(EscrowError::Open)));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let rng = SystemRandom::new();
        let mut sealed = seal(&key(1), &rng, b"", b"secret").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xFF;
        assert!(open(&key(1), b"", &sealed).is_err());
    }

    #[test]
    fn too_short_is_malformed() {
        assert!(matches!(
            open(&key(1), b"", &[0u8; 5]),
            Err(EscrowError::Malformed(_))
        ));
    }
}
