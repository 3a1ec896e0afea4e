// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Identity Gate
//!
//! Caller identity, authority levels and password verification.
//!
//! ## Trust Flow
//!
//! 1. The transport layer verifies the caller's cryptographic identity
//! 2. It forwards the identity in the configured request header
//! 3. This service:
//!    - reads it with the [`Caller`] extractor
//!    - resolves it to zero or one account
//!    - gates file and key access with [`can_read`]
//!
//! ## Security
//!
//! - Passwords are stored only as salted PBKDF2 verifiers
//! - Authority comparison lives in exactly one predicate

pub mod authority;
pub mod error;
pub mod identity;
pub mod password;

pub use authority::{can_read, AuthorityLevel, AuthorityOutOfRange};
pub use error::AuthError;
pub use identity::{Caller, Identity};
pub use password::PasswordVerifier;
