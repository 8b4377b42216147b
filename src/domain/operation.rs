//! Append-only operation log.
//!
//! Every action accepted past the gate lands here, successes and domain
//! rejections alike. Entries are immutable once written and indexed
//! sequentially from 0; the index order is the sole happened-before
//! relation for replay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{RawAction, Scope};

/// Domain errors carry a stable machine-readable code alongside their
/// human-readable `Display` message.
pub trait DomainError: std::error::Error {
    fn code(&self) -> &'static str;
}

/// Captured domain rejection stored in a log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationError {
    /// Stable error code, e.g. `EVENT_ALREADY_SUPERSEDED`.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl OperationError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn from_domain<E: DomainError>(err: &E) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// One log entry: the submitted action plus its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Position in the log, assigned sequentially from 0; never reused.
    pub index: u64,

    /// Namespace the action targeted.
    pub scope: Scope,

    /// Action type tag as submitted.
    #[serde(rename = "type")]
    pub action_type: String,

    /// Action payload as submitted.
    pub payload: Value,

    /// Caller context, carried verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// Stamped when the entry was first appended; preserved by replay.
    pub recorded_at: DateTime<Utc>,

    /// Captured domain error; `None` means the action applied cleanly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationError>,
}

impl Operation {
    pub fn is_applied(&self) -> bool {
        self.error.is_none()
    }

    /// Reconstruct the submitted action, used when replaying the log.
    pub fn raw_action(&self) -> RawAction {
        RawAction {
            action_type: self.action_type.clone(),
            scope: self.scope,
            payload: self.payload.clone(),
            context: self.context.clone(),
        }
    }
}

/// Audit-trail summary counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LogStats {
    pub total: u64,
    pub applied: u64,
    pub rejected: u64,
    pub shared: u64,
    pub private: u64,
}

/// The append-only, index-ordered record of applied and rejected actions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationLog {
    entries: Vec<Operation>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index the next appended entry will receive.
    pub fn next_index(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn get(&self, index: u64) -> Option<&Operation> {
        self.entries.get(index as usize)
    }

    pub fn last(&self) -> Option<&Operation> {
        self.entries.last()
    }

    pub fn entries(&self) -> &[Operation] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.entries.iter()
    }

    /// Append the next entry. The engine is the only writer; the index must
    /// be the one handed out by [`OperationLog::next_index`].
    pub(crate) fn append(&mut self, operation: Operation) {
        debug_assert_eq!(operation.index, self.next_index());
        self.entries.push(operation);
    }

    pub fn stats(&self) -> LogStats {
        let mut stats = LogStats::default();
        for entry in &self.entries {
            stats.total += 1;
            if entry.is_applied() {
                stats.applied += 1;
            } else {
                stats.rejected += 1;
            }
            match entry.scope {
                Scope::Shared => stats.shared += 1,
                Scope::Private => stats.private += 1,
            }
        }
        stats
    }
}
