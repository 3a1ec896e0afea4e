// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authority Vault - Access-Controlled File Store with Key Escrow
//!
//! Callers register an identity-bound account with a numeric authority level
//! (0 is the strongest), upload ciphertext gated by an authority threshold,
//! read it back subject to the same check, and fetch the file's content key
//! re-wrapped to their own transport key. Every attempt lands in an
//! append-only audit log.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Caller identity, authority levels, password verifiers
//! - `escrow` - Content key sealing and per-caller wrapping
//! - `storage` - Embedded redb database and audit log
//! - `vault` - The service core tying the above together

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod escrow;
pub mod models;
pub mod state;
pub mod storage;
pub mod vault;
