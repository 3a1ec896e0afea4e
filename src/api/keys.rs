// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use super::{reject, with_vault};
use crate::{
    auth::Caller,
    error::ApiError,
    escrow::TransportPublicKey,
    models::{decode_base64, encode_base64, GetEncryptedKeyRequest, GetEncryptedKeyResponse},
    state::AppState,
    vault::{key_request_event, VaultError},
};

/// Release content keys wrapped to the caller's transport key.
#[utoipa::path(
    post,
    path = "/v1/get_encrypted_key",
    request_body = GetEncryptedKeyRequest,
    tag = "Keys",
    params(("x-caller-identity" = String, Header, description = "Verified caller identity")),
    responses(
        (status = 200, body = GetEncryptedKeyResponse),
        (status = 400, description = "Malformed file reference or transport key"),
        (status = 401, description = "Missing caller identity"),
        (status = 403, description = "Caller may not read every requested file"),
        (status = 500, description = "Internal failure")
    )
)]
pub async fn get_encrypted_key(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(request): Json<GetEncryptedKeyRequest>,
) -> Result<Json<GetEncryptedKeyResponse>, ApiError> {
    let (file_refs, transport) = match decode_key_request(&request) {
        Ok(decoded) => decoded,
        Err(reason) => {
            // Logged with the refs as sent since they could not be decoded.
            let event = key_request_event(&caller, &request.file_refs);
            return Err(reject(&state, event, VaultError::InvalidRequest(reason)).await);
        }
    };

    let wrapped = with_vault(&state, move |vault| {
        vault.get_encrypted_key(&caller, &file_refs, &transport)
    })
    .await??;

    Ok(Json(GetEncryptedKeyResponse {
        encrypted_key: encode_base64(&wrapped),
    }))
}

fn decode_key_request(
    request: &GetEncryptedKeyRequest,
) -> Result<(Vec<Vec<u8>>, TransportPublicKey), String> {
    let file_refs = request
        .file_refs
        .iter()
        .map(|r| decode_base64("file_refs", r))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.message)?;

    let transport_bytes = decode_base64("transport_public_key", &request.transport_public_key)
        .map_err(|e| e.message)?;
    let transport = TransportPublicKey::try_from(transport_bytes.as_slice())
        .map_err(|_| "transport_public_key must be 32 bytes".to_string())?;

    Ok((file_refs, transport))
}
