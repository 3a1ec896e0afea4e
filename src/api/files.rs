// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! File endpoints.
//!
//! Every file endpoint acts for the header caller. Like registration,
//! uploads answer `204` whether or not the vault accepted the file; a
//! rejected upload leaves any previous version in place and shows up in the
//! audit log. Bodies that cannot be decoded are refused with `400` and
//! logged as denials too.

use axum::{extract::State, http::StatusCode, Json};

use super::{bind_caller, reject, with_vault};
use crate::{
    auth::{Caller, Identity},
    error::ApiError,
    escrow::ContentKey,
    models::{
        decode_base64, encode_base64, ReadFileRequest, ReadFileResponse,
        UploadEncryptedFileRequest, UploadFileRequest,
    },
    state::AppState,
    vault::{read_event, upload_event, VaultError, VaultResult},
};

/// Store text content.
#[utoipa::path(
    post,
    path = "/v1/upload_file",
    request_body = UploadFileRequest,
    tag = "Files",
    params(("x-caller-identity" = String, Header, description = "Verified caller identity")),
    responses(
        (status = 204, description = "Request processed"),
        (status = 401, description = "Missing caller identity"),
        (status = 500, description = "Internal failure")
    )
)]
pub async fn upload_file(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(request): Json<UploadFileRequest>,
) -> Result<StatusCode, ApiError> {
    store(&state, caller, request.title, request.content.into_bytes(), request.authority_level, None)
        .await
}

/// Store client-encrypted content, optionally escrowing the client's key.
#[utoipa::path(
    post,
    path = "/v1/upload_encrypted_file",
    request_body = UploadEncryptedFileRequest,
    tag = "Files",
    params(("x-caller-identity" = String, Header, description = "Verified caller identity")),
    responses(
        (status = 204, description = "Request processed"),
        (status = 400, description = "Malformed base64 or content key"),
        (status = 401, description = "Missing caller identity"),
        (status = 500, description = "Internal failure")
    )
)]
pub async fn upload_encrypted_file(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(request): Json<UploadEncryptedFileRequest>,
) -> Result<StatusCode, ApiError> {
    let (content, content_key) = match decode_upload(&request) {
        Ok(decoded) => decoded,
        Err(reason) => {
            let event = upload_event(&caller, &request.title, request.authority_level);
            return Err(reject(&state, event, VaultError::InvalidRequest(reason)).await);
        }
    };

    store(&state, caller, request.title, content, request.authority_level, content_key).await
}

fn decode_upload(
    request: &UploadEncryptedFileRequest,
) -> Result<(Vec<u8>, Option<ContentKey>), String> {
    let content = decode_base64("content", &request.content).map_err(|e| e.message)?;
    let content_key = match request.content_key.as_deref() {
        Some(encoded) => {
            let bytes = decode_base64("content_key", encoded).map_err(|e| e.message)?;
            let key = ContentKey::try_from(bytes.as_slice())
                .map_err(|_| "content_key must be 32 bytes".to_string())?;
            Some(key)
        }
        None => None,
    };
    Ok((content, content_key))
}

async fn store(
    state: &AppState,
    caller: Identity,
    title: String,
    content: Vec<u8>,
    authority_level: i64,
    content_key: Option<ContentKey>,
) -> Result<StatusCode, ApiError> {
    let outcome = with_vault(state, move |vault| {
        vault.upload(&caller, &title, &content, authority_level, content_key)
    })
    .await?;

    silent(outcome)
}

fn silent(outcome: VaultResult<()>) -> Result<StatusCode, ApiError> {
    match outcome {
        Err(err) if err.is_internal() => Err(err.into()),
        Err(err) => {
            tracing::debug!(error = %err, "upload denied");
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(()) => Ok(StatusCode::NO_CONTENT),
    }
}

/// Read a file. Missing and unreadable files both yield empty content.
///
/// The body's `identity` must be the header caller.
#[utoipa::path(
    post,
    path = "/v1/read_file",
    request_body = ReadFileRequest,
    tag = "Files",
    params(("x-caller-identity" = String, Header, description = "Verified caller identity")),
    responses(
        (status = 200, body = ReadFileResponse),
        (status = 401, description = "Missing caller identity"),
        (status = 403, description = "Body identity is not the caller"),
        (status = 500, description = "Internal failure")
    )
)]
pub async fn read_file(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(request): Json<ReadFileRequest>,
) -> Result<Json<ReadFileResponse>, ApiError> {
    let event = read_event(&caller, &request.title);
    bind_caller(&state, &caller, &request.identity, event).await?;

    let outcome = with_vault(&state, move |vault| vault.read(&request.title, &caller)).await?;

    let content = match outcome {
        Ok(bytes) => encode_base64(&bytes),
        Err(err) if err.is_internal() => return Err(err.into()),
        Err(err) => {
            tracing::debug!(error = %err, "read denied");
            String::new()
        }
    };
    Ok(Json(ReadFileResponse { content }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::test_state;
    use crate::storage::{AuditAction, AuditStatus, LogOrder};

    fn setup() -> AppState {
        let state = test_state();
        state.vault.register(&Identity::from("P1"), "alice", "x", 10).unwrap();
        state.vault.register(&Identity::from("P2"), "bob", "x", 100).unwrap();
        state
    }

    async fn read_as(state: &AppState, identity: &str, title: &str) -> ReadFileResponse {
        let request = Json(ReadFileRequest {
            title: title.into(),
            identity: Identity::from(identity),
        });
        let Json(response) = read_file(State(state.clone()), Caller(Identity::from(identity)), request)
            .await
            .unwrap();
        response
    }

    #[tokio::test]
    async fn text_upload_reads_back_as_base64() {
        let state = setup();
        let request = UploadFileRequest {
            title: "doc1".into(),
            content: "hello".into(),
            authority_level: 50,
        };

        let status = upload_file(State(state.clone()), Caller(Identity::from("P1")), Json(request))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        assert_eq!(read_as(&state, "P1", "doc1").await.content, "aGVsbG8=");
        assert_eq!(read_as(&state, "P2", "doc1").await.content, "");
        assert_eq!(read_as(&state, "P1", "nope").await.content, "");
    }

    #[tokio::test]
    async fn encrypted_upload_keeps_bytes_verbatim() {
        let state = setup();
        let ciphertext = vec![0u8, 159, 146, 150, 255];
        let request = UploadEncryptedFileRequest {
            title: "blob".into(),
            content: encode_base64(&ciphertext),
            authority_level: 200,
            content_key: Some(encode_base64(&[7u8; 32])),
        };

        upload_encrypted_file(State(state.clone()), Caller(Identity::from("P1")), Json(request))
            .await
            .unwrap();

        let read = read_as(&state, "P2", "blob").await;
        assert_eq!(decode_base64("content", &read.content).unwrap(), ciphertext);
    }

    #[tokio::test]
    async fn malformed_upload_is_bad_request() {
        let state = setup();
        let bad_content = UploadEncryptedFileRequest {
            title: "blob".into(),
            content: "%%%".into(),
            authority_level: 1,
            content_key: None,
        };
        let err = upload_encrypted_file(State(state.clone()), Caller(Identity::from("P1")), Json(bad_content))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let short_key = UploadEncryptedFileRequest {
            title: "blob".into(),
            content: encode_base64(b"c"),
            authority_level: 1,
            content_key: Some(encode_base64(&[1u8; 16])),
        };
        let err = upload_encrypted_file(State(state.clone()), Caller(Identity::from("P1")), Json(short_key))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let logs = state.vault.read_logs(2, LogOrder::Recent).unwrap();
        assert_eq!(
            logs[0].details,
            "title=blob required_authority=1: invalid request: content_key must be 32 bytes"
        );
        assert_eq!(
            logs[1].details,
            "title=blob required_authority=1: invalid request: content is not valid base64"
        );
        for entry in &logs {
            assert_eq!(entry.action, AuditAction::Upload);
            assert_eq!(entry.status, AuditStatus::Denied);
            assert_eq!(entry.actor.as_str(), "P1");
        }
        assert_eq!(read_as(&state, "P1", "blob").await.content, "");
    }

    #[tokio::test]
    async fn read_for_another_identity_is_forbidden_and_audited() {
        let state = setup();
        state.vault.upload(&Identity::from("P1"), "doc1", b"payload", 50, None).unwrap();

        let request = Json(ReadFileRequest {
            title: "doc1".into(),
            identity: Identity::from("P1"),
        });
        let err = read_file(State(state.clone()), Caller(Identity::from("P2")), request)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let entry = &state.vault.read_logs(1, LogOrder::Recent).unwrap()[0];
        assert_eq!(entry.action, AuditAction::Read);
        assert_eq!(entry.status, AuditStatus::Denied);
        assert_eq!(entry.actor.as_str(), "P2");
        assert_eq!(entry.details, "title=doc1: identity does not match caller");
    }

    #[tokio::test]
    async fn unregistered_upload_is_silent_but_audited() {
        let state = setup();
        let request = UploadFileRequest {
            title: "doc1".into(),
            content: "hello".into(),
            authority_level: 50,
        };

        let status = upload_file(State(state.clone()), Caller(Identity::from("ghost")), Json(request))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let entry = &state.vault.read_logs(1, LogOrder::Recent).unwrap()[0];
        assert_eq!(entry.action, AuditAction::Upload);
        assert_eq!(entry.status, AuditStatus::Denied);
        assert!(entry.details.ends_with("caller has no account"));
    }
}
