// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for every terminal outcome.
//!
//! Registration, login, upload, read and key requests each append exactly
//! one entry, success or not, inside the same database transaction that
//! decided the outcome. Entries are never updated or removed.

use chrono::{DateTime, TimeDelta, Utc};
use redb::{AccessGuard, ReadableTable, Table};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::StorageResult;
use crate::auth::Identity;

/// Auditable actions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Register,
    Login,
    Upload,
    Read,
    KeyRequest,
}

/// Outcome of an audited operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Success,
    Denied,
    Error,
}

/// A committed audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct LogEntry {
    /// Position in the log, starting at 1.
    pub sequence: u64,
    /// Service-assigned time, strictly increasing in insertion order.
    pub timestamp: DateTime<Utc>,
    /// Identity that triggered the event.
    pub actor: Identity,
    pub action: AuditAction,
    pub status: AuditStatus,
    /// Free text: file title, denial reason. Never credentials or content.
    pub details: String,
}

/// An event waiting to be appended. Sequence and timestamp are assigned on
/// append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    pub actor: Identity,
    pub action: AuditAction,
    pub status: AuditStatus,
    pub details: String,
}

impl AuditEvent {
    /// Create a new successful event.
    pub fn new(action: AuditAction, actor: &Identity) -> Self {
        Self {
            actor: actor.clone(),
            action,
            status: AuditStatus::Success,
            details: String::new(),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    /// Mark as denied, appending the reason to the details.
    pub fn denied(self, reason: impl std::fmt::Display) -> Self {
        self.with_outcome(AuditStatus::Denied, reason)
    }

    /// Mark as failed, appending the reason to the details.
    pub fn failed(self, reason: impl std::fmt::Display) -> Self {
        self.with_outcome(AuditStatus::Error, reason)
    }

    fn with_outcome(mut self, status: AuditStatus, reason: impl std::fmt::Display) -> Self {
        self.status = status;
        self.details = if self.details.is_empty() {
            reason.to_string()
        } else {
            format!("{}: {reason}", self.details)
        };
        self
    }
}

/// Read order for [`read_entries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogOrder {
    /// Oldest first.
    #[default]
    Oldest,
    /// Newest first.
    Recent,
}

impl LogOrder {
    /// Parse a wire order selector. `"recent"` (any case) is newest first;
    /// everything else is oldest first.
    pub fn from_selector(selector: &str) -> Self {
        if selector.trim().eq_ignore_ascii_case("recent") {
            LogOrder::Recent
        } else {
            LogOrder::Oldest
        }
    }
}

/// Append an event to the log table.
///
/// Callers hold the database's single write transaction, so sequence and
/// timestamp assignment cannot interleave with another append.
pub(super) fn append(
    table: &mut Table<'_, u64, &'static [u8]>,
    event: AuditEvent,
) -> StorageResult<LogEntry> {
    let previous = match table.last()? {
        Some((_, value)) => Some(serde_json::from_slice::<LogEntry>(value.value())?),
        None => None,
    };

    let now = Utc::now();
    let (sequence, timestamp) = match previous {
        Some(prev) => (
            prev.sequence + 1,
            now.max(prev.timestamp + TimeDelta::microseconds(1)),
        ),
        None => (1, now),
    };

    let entry = LogEntry {
        sequence,
        timestamp,
        actor: event.actor,
        action: event.action,
        status: event.status,
        details: event.details,
    };

    let json = serde_json::to_vec(&entry)?;
    table.insert(sequence, json.as_slice())?;
    Ok(entry)
}

/// Read up to `limit` entries from either end of the log.
pub(super) fn read_entries<T>(
    table: &T,
    limit: usize,
    order: LogOrder,
) -> StorageResult<Vec<LogEntry>>
where
    T: ReadableTable<u64, &'static [u8]>,
{
    let range = table.iter()?;
    match order {
        LogOrder::Oldest => decode_rows(range, limit),
        LogOrder::Recent => decode_rows(range.rev(), limit),
    }
}

type Row<'a> = Result<(AccessGuard<'a, u64>, AccessGuard<'a, &'static [u8]>), redb::StorageError>;

fn decode_rows<'a>(rows: impl Iterator<Item = Row<'a>>, limit: usize) -> StorageResult<Vec<LogEntry>> {
    let mut entries = Vec::with_capacity(limit.min(1024));
    for row in rows.take(limit) {
        let (_, value) = row?;
        entries.push(serde_json::from_slice(value.value())?);
    }
    Ok(entries)
}
