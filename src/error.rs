// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::vault::VaultError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    }
}

impl From<VaultError> for ApiError {
    fn from(err: VaultError) -> Self {
        let status = match &err {
            VaultError::NotAuthenticated | VaultError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            VaultError::AlreadyRegistered => StatusCode::CONFLICT,
            VaultError::InvalidAuthority(_) | VaultError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            VaultError::NotFound => StatusCode::NOT_FOUND,
            VaultError::Forbidden | VaultError::IdentityMismatch => StatusCode::FORBIDDEN,
            // Details are in the server log and the audit trail.
            VaultError::Internal(_) => return Self::internal(),
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
