// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Salted password verifiers (PBKDF2-HMAC-SHA256).
//!
//! Raw passwords never leave this module: accounts store only the salt, the
//! iteration count and the derived hash.

use std::num::NonZeroU32;

use ring::{
    error::Unspecified,
    pbkdf2,
    rand::{SecureRandom, SystemRandom},
};
use serde::{Deserialize, Serialize};

static ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;

/// Derived hash length in bytes.
pub const HASH_LEN: usize = 32;

/// Default PBKDF2 iteration count.
pub const DEFAULT_ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(n) => n,
    None => unreachable!(),
};

/// Stored password verifier.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PasswordVerifier {
    salt: Vec<u8>,
    iterations: NonZeroU32,
    hash: Vec<u8>,
}

impl PasswordVerifier {
    /// Derive a verifier for `password` under a fresh random salt.
    pub fn derive(
        password: &str,
        iterations: NonZeroU32,
        rng: &SystemRandom,
    ) -> Result<Self, Unspecified> {
        let mut salt = [0u8; SALT_LEN];
        rng.fill(&mut salt)?;

        let mut hash = [0u8; HASH_LEN];
        pbkdf2::derive(ALGORITHM, iterations, &salt, password.as_bytes(), &mut hash);

        Ok(Self {
            salt: salt.to_vec(),
            iterations,
            hash: hash.to_vec(),
        })
    }

    /// Constant-time check of `password` against this verifier.
    pub fn verify(&self, password: &str) -> bool {
        pbkdf2::verify(
            ALGORITHM,
            self.iterations,
            &self.salt,
            password.as_bytes(),
            &self.hash,
        )
        .is_ok()
    }
}

impl std::fmt::Debug for PasswordVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordVerifier")
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}
