// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use super::with_vault;
use crate::{
    error::ApiError,
    models::ReadLogsRequest,
    state::AppState,
    storage::{LogEntry, LogOrder},
};

/// Read the audit trail.
#[utoipa::path(
    post,
    path = "/v1/read_logs",
    request_body = ReadLogsRequest,
    tag = "Logs",
    responses((status = 200, body = [LogEntry]))
)]
pub async fn read_logs(
    State(state): State<AppState>,
    Json(request): Json<ReadLogsRequest>,
) -> Result<Json<Vec<LogEntry>>, ApiError> {
    let order = LogOrder::from_selector(&request.order);
    let entries = with_vault(&state, move |vault| vault.read_logs(request.limit, order)).await??;
    Ok(Json(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::state::tests::test_state;
    use crate::storage::AuditAction;

    #[tokio::test]
    async fn order_selector_controls_direction() {
        let state = test_state();
        for name in ["a", "b", "c"] {
            state.vault.authenticate(&Identity::from(name), name, "pw").unwrap();
        }

        let recent = Json(ReadLogsRequest {
            limit: 2,
            order: "Recent".into(),
        });
        let Json(newest) = read_logs(State(state.clone()), recent).await.unwrap();
        let actors: Vec<&str> = newest.iter().map(|e| e.actor.as_str()).collect();
        assert_eq!(actors, vec!["c", "b"]);

        let other = Json(ReadLogsRequest {
            limit: 10,
            order: "whatever".into(),
        });
        let Json(oldest) = read_logs(State(state), other).await.unwrap();
        let actors: Vec<&str> = oldest.iter().map(|e| e.actor.as_str()).collect();
        assert_eq!(actors, vec!["a", "b", "c"]);
        assert!(oldest.iter().all(|e| e.action == AuditAction::Login));
    }

    #[tokio::test]
    async fn entries_serialize_with_snake_case_enums() {
        let state = test_state();
        state.vault.authenticate(&Identity::from("p"), "u", "pw").unwrap();

        let request = Json(ReadLogsRequest {
            limit: 1,
            order: String::new(),
        });
        let Json(entries) = read_logs(State(state), request).await.unwrap();
        let json = serde_json::to_value(&entries[0]).unwrap();
        assert_eq!(json["action"], "login");
        assert_eq!(json["status"], "denied");
        assert_eq!(json["sequence"], 1);
    }
}
