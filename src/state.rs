// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum::http::HeaderName;

use crate::vault::Vault;

#[derive(Clone)]
pub struct AppState {
    pub vault: Arc<Vault>,
    /// Header the transport layer uses to forward the verified caller.
    pub identity_header: HeaderName,
}

impl AppState {
    pub fn new(vault: Vault, identity_header: HeaderName) -> Self {
        Self {
            vault: Arc::new(vault),
            identity_header,
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::config::DEFAULT_IDENTITY_HEADER;
    use crate::vault::testing;

    pub fn test_state() -> AppState {
        AppState::new(
            testing::vault(),
            HeaderName::from_static(DEFAULT_IDENTITY_HEADER),
        )
    }
}
