// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory for `vault.redb` and `escrow.key` | unset (in-memory) |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `IDENTITY_HEADER` | Header carrying the verified caller identity | `x-caller-identity` |
//! | `PASSWORD_HASH_ITERATIONS` | PBKDF2 iterations for new verifiers | `100000` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::num::NonZeroU32;
use std::path::PathBuf;

use axum::http::HeaderName;

use crate::auth::password::DEFAULT_ITERATIONS;

/// Environment variable name for the vault data directory.
///
/// When unset the vault runs entirely in memory with an ephemeral master
/// key, which is only useful for development and tests.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the caller identity header.
///
/// The transport layer in front of this service authenticates the caller
/// and forwards the verified identity in this header.
pub const IDENTITY_HEADER_ENV: &str = "IDENTITY_HEADER";

pub const PASSWORD_HASH_ITERATIONS_ENV: &str = "PASSWORD_HASH_ITERATIONS";

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_IDENTITY_HEADER: &str = "x-caller-identity";
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is not a valid port: {value}")]
    InvalidPort { name: &'static str, value: String },

    #[error("{name} is not a valid header name: {value}")]
    InvalidHeader { name: &'static str, value: String },

    #[error("{name} must be a positive integer: {value}")]
    InvalidIterations { name: &'static str, value: String },
}

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    pub fn from_value(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Fully resolved service configuration.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    pub data_dir: Option<PathBuf>,
    pub host: String,
    pub port: u16,
    pub identity_header: HeaderName,
    pub hash_iterations: NonZeroU32,
    pub log_format: LogFormat,
}

impl VaultConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let data_dir = lookup(DATA_DIR_ENV)
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);

        let host = lookup(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match lookup(PORT_ENV) {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidPort {
                name: PORT_ENV,
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let header = lookup(IDENTITY_HEADER_ENV).unwrap_or_else(|| DEFAULT_IDENTITY_HEADER.to_string());
        let identity_header =
            HeaderName::try_from(header.trim()).map_err(|_| ConfigError::InvalidHeader {
                name: IDENTITY_HEADER_ENV,
                value: header.clone(),
            })?;

        let hash_iterations = match lookup(PASSWORD_HASH_ITERATIONS_ENV) {
            Some(value) => value
                .trim()
                .parse::<u32>()
                .ok()
                .and_then(NonZeroU32::new)
                .ok_or(ConfigError::InvalidIterations {
                    name: PASSWORD_HASH_ITERATIONS_ENV,
                    value,
                })?,
            None => DEFAULT_ITERATIONS,
        };

        Ok(Self {
            data_dir,
            host,
            port,
            identity_header,
            hash_iterations,
            log_format: LogFormat::from_value(lookup(LOG_FORMAT_ENV).as_deref()),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
