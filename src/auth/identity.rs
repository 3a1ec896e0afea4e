// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Caller identities and the Axum extractor that reads them.
//!
//! The transport layer in front of this service verifies the caller's
//! cryptographic identity and forwards it in a request header (see
//! `IDENTITY_HEADER` in [`crate::config`]). This service treats the value as
//! an opaque, unforgeable token.
//!
//! ```rust,ignore
//! async fn upload(Caller(identity): Caller) -> impl IntoResponse {
//!     // identity is the transport-verified caller
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::AuthError;
use crate::state::AppState;

/// Opaque caller identity supplied by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Identity(value)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Identity(value.to_string())
    }
}

/// Extractor for the transport-verified caller.
pub struct Caller(pub Identity);

impl FromRequestParts<AppState> for Caller {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(&state.identity_header)
            .ok_or(AuthError::MissingIdentity)?
            .to_str()
            .map_err(|_| AuthError::InvalidIdentity)?
            .trim();

        if value.is_empty() {
            return Err(AuthError::InvalidIdentity);
        }

        Ok(Caller(Identity::new(value)))
    }
}
