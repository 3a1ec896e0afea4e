// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! This module defines the request and response data structures used by
//! the RPC surface. All types derive `Serialize` or `Deserialize` and
//! `ToSchema` for automatic JSON handling and OpenAPI documentation.
//!
//! ## Byte Fields
//!
//! Ciphertext, content keys, file references and wrapped key blobs travel as
//! standard-alphabet base64 strings. [`decode_base64`] turns a malformed value
//! into a `400` naming the offending field.
//!
//! ## Model Categories
//!
//! - **Accounts**: registration, login and registration lookup
//! - **Files**: upload and read
//! - **Keys**: escrowed content key release
//! - **Logs**: audit log reads

use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Identity;
use crate::error::ApiError;

/// Encode bytes for a JSON response field.
pub fn encode_base64(bytes: &[u8]) -> String {
    Base64::encode_string(bytes)
}

/// Decode a base64 request field.
pub fn decode_base64(field: &str, value: &str) -> Result<Vec<u8>, ApiError> {
    Base64::decode_vec(value.trim())
        .map_err(|_| ApiError::bad_request(format!("{field} is not valid base64")))
}

// =============================================================================
// Account Models
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckRegisteredRequest {
    pub identity: Identity,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct CheckRegisteredResponse {
    pub registered: bool,
}

/// Request to bind a new account to an identity.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Must equal the caller named by the identity header.
    pub identity: Identity,
    /// Human-readable handle, unique across accounts.
    pub user_id: String,
    pub password: String,
    /// 0 is the highest authority, 255 the lowest.
    pub authority_level: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Must equal the caller named by the identity header.
    pub identity: Identity,
    pub user_id: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct LoginResponse {
    pub authenticated: bool,
}

// =============================================================================
// File Models
// =============================================================================

/// Upload of text content, stored as its UTF-8 bytes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadFileRequest {
    pub title: String,
    pub content: String,
    /// Weakest authority level still allowed to read the file.
    pub authority_level: i64,
}

/// Upload of client-encrypted content.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadEncryptedFileRequest {
    pub title: String,
    /// Ciphertext, base64.
    pub content: String,
    /// Weakest authority level still allowed to read the file.
    pub authority_level: i64,
    /// The 32-byte key the content was encrypted with, base64. Generated by
    /// the service when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReadFileRequest {
    pub title: String,
    /// Must equal the caller named by the identity header.
    pub identity: Identity,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ReadFileResponse {
    /// Stored bytes, base64. Empty when the file is missing or unreadable.
    pub content: String,
}

// =============================================================================
// Key Escrow Models
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GetEncryptedKeyRequest {
    /// File references (UTF-8 titles), each base64.
    pub file_refs: Vec<String>,
    /// Caller's X25519 public key, base64.
    pub transport_public_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct GetEncryptedKeyResponse {
    /// `ephemeral_public || nonce || sealed keys`, base64.
    pub encrypted_key: String,
}

// =============================================================================
// Audit Log Models
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReadLogsRequest {
    pub limit: usize,
    /// `"recent"` for newest first; anything else is oldest first.
    #[serde(default)]
    pub order: String,
}
