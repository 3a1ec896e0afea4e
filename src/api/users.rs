// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account endpoints.
//!
//! Login and registration act for the header caller. The `identity` field
//! their bodies carry must name that same caller or the request is refused
//! with `403` and logged as a denial.

use axum::{extract::State, http::StatusCode, Json};

use super::{bind_caller, with_vault};
use crate::{
    auth::Caller,
    error::ApiError,
    models::{
        CheckRegisteredRequest, CheckRegisteredResponse, LoginRequest, LoginResponse,
        RegisterRequest,
    },
    state::AppState,
    vault::{login_event, register_event},
};

/// Check whether an account is bound to an identity.
#[utoipa::path(
    post,
    path = "/v1/check_user_registered",
    request_body = CheckRegisteredRequest,
    tag = "Accounts",
    responses((status = 200, body = CheckRegisteredResponse))
)]
pub async fn check_user_registered(
    State(state): State<AppState>,
    Json(request): Json<CheckRegisteredRequest>,
) -> Result<Json<CheckRegisteredResponse>, ApiError> {
    let registered = with_vault(&state, move |vault| vault.is_registered(&request.identity)).await??;
    Ok(Json(CheckRegisteredResponse { registered }))
}

/// Verify credentials. Any mismatch yields `authenticated: false`.
#[utoipa::path(
    post,
    path = "/v1/login",
    request_body = LoginRequest,
    tag = "Accounts",
    params(("x-caller-identity" = String, Header, description = "Verified caller identity")),
    responses(
        (status = 200, body = LoginResponse),
        (status = 401, description = "Missing caller identity"),
        (status = 403, description = "Body identity is not the caller")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let event = login_event(&caller, &request.user_id);
    bind_caller(&state, &caller, &request.identity, event).await?;

    let authenticated = with_vault(&state, move |vault| {
        vault.authenticate(&caller, &request.user_id, &request.password)
    })
    .await??;
    Ok(Json(LoginResponse { authenticated }))
}

/// Register an account.
///
/// Duplicates and out-of-range authority levels are not reported to the
/// caller; they are recorded in the audit log.
#[utoipa::path(
    post,
    path = "/v1/register_user",
    request_body = RegisterRequest,
    tag = "Accounts",
    params(("x-caller-identity" = String, Header, description = "Verified caller identity")),
    responses(
        (status = 204, description = "Request processed"),
        (status = 401, description = "Missing caller identity"),
        (status = 403, description = "Body identity is not the caller"),
        (status = 500, description = "Internal failure")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(request): Json<RegisterRequest>,
) -> Result<StatusCode, ApiError> {
    let event = register_event(&caller, &request.user_id, request.authority_level);
    bind_caller(&state, &caller, &request.identity, event).await?;

    let outcome = with_vault(&state, move |vault| {
        vault.register(
            &caller,
            &request.user_id,
            &request.password,
            request.authority_level,
        )
    })
    .await?;

    match outcome {
        Err(err) if err.is_internal() => Err(err.into()),
        Err(err) => {
            tracing::debug!(error = %err, "registration denied");
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(()) => Ok(StatusCode::NO_CONTENT),
    }
}
