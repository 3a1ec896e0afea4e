// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum::{
    http::HeaderName,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::Identity,
    error::ApiError,
    models::{
        CheckRegisteredRequest, CheckRegisteredResponse, GetEncryptedKeyRequest,
        GetEncryptedKeyResponse, LoginRequest, LoginResponse, ReadFileRequest, ReadFileResponse,
        ReadLogsRequest, RegisterRequest, UploadEncryptedFileRequest, UploadFileRequest,
    },
    state::AppState,
    storage::{AuditAction, AuditEvent, AuditStatus, LogEntry},
    vault::{Vault, VaultError, VaultResult},
};

pub mod files;
pub mod health;
pub mod keys;
pub mod logs;
pub mod users;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/check_user_registered", post(users::check_user_registered))
        .route("/login", post(users::login))
        .route("/register_user", post(users::register_user))
        .route("/upload_file", post(files::upload_file))
        .route("/upload_encrypted_file", post(files::upload_encrypted_file))
        .route("/read_file", post(files::read_file))
        .route("/get_encrypted_key", post(keys::get_encrypted_key))
        .route("/read_logs", post(logs::read_logs))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

/// Run a blocking vault call on the blocking thread pool.
///
/// The outer error only covers a panicked or cancelled task; the vault's own
/// outcome is returned untouched so handlers can decide how to surface it.
pub(crate) async fn with_vault<T, F>(state: &AppState, op: F) -> Result<VaultResult<T>, ApiError>
where
    F: FnOnce(&Vault) -> VaultResult<T> + Send + 'static,
    T: Send + 'static,
{
    let vault = Arc::clone(&state.vault);
    tokio::task::spawn_blocking(move || op(&vault))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "vault task failed");
            ApiError::internal()
        })
}

/// Record a request turned away at the wire as a denial and map it to a
/// response.
pub(crate) async fn reject(state: &AppState, event: AuditEvent, err: VaultError) -> ApiError {
    match with_vault(state, move |vault| Ok(vault.reject(event, err))).await {
        Ok(Ok(recorded)) | Ok(Err(recorded)) => recorded.into(),
        Err(e) => e,
    }
}

/// An identity carried in a request body must name the header caller.
pub(crate) async fn bind_caller(
    state: &AppState,
    caller: &Identity,
    claimed: &Identity,
    event: AuditEvent,
) -> Result<(), ApiError> {
    if claimed == caller {
        return Ok(());
    }
    tracing::warn!(%caller, %claimed, "request body names another identity");
    Err(reject(state, event, VaultError::IdentityMismatch).await)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        users::check_user_registered,
        users::login,
        users::register_user,
        files::upload_file,
        files::upload_encrypted_file,
        files::read_file,
        keys::get_encrypted_key,
        logs::read_logs,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            CheckRegisteredRequest,
            CheckRegisteredResponse,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            UploadFileRequest,
            UploadEncryptedFileRequest,
            ReadFileRequest,
            ReadFileResponse,
            GetEncryptedKeyRequest,
            GetEncryptedKeyResponse,
            ReadLogsRequest,
            LogEntry,
            AuditAction,
            AuditStatus,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Accounts", description = "Registration and login"),
        (name = "Files", description = "Authority-gated file storage"),
        (name = "Keys", description = "Escrowed content key release"),
        (name = "Logs", description = "Audit trail"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
