// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path layout for the on-disk data directory.
//!
//! ```text
//! {DATA_DIR}/
//!   vault.redb    # accounts, files, key records, audit log
//!   escrow.key    # service master key (NEVER exposed via API)
//! ```

use std::path::{Path, PathBuf};

const DATABASE_FILE: &str = "vault.redb";
const ESCROW_KEY_FILE: &str = "escrow.key";

/// Storage path utilities for the data directory.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl StoragePaths {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the redb database.
    pub fn database(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    /// Path to the escrow master key.
    pub fn escrow_key(&self) -> PathBuf {
        self.root.join(ESCROW_KEY_FILE)
    }
}
