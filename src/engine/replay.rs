//! Log replay: rebuild a document from its operation log and verify that
//! the log still reproduces the live state.
//!
//! Replay feeds every entry back through the normal apply path with
//! unbounded gate limits (entries already passed the gate when first
//! applied) and carries each entry's `recorded_at` verbatim, so a faithful
//! replay reproduces the document bit-for-bit, digests included.

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::digest::{document_digest, state_digest, DigestError};
use crate::domain::{
    hash256_hex, Document, DocumentHeader, DocumentModel, Hash256, OperationError, OperationLog,
};
use crate::engine::ApplyOutcome;
use crate::schema::{GateLimits, SchemaViolation};

/// Options for prefix replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayOptions {
    /// Stop after this many log entries; `None` replays the whole log.
    pub stop_at: Option<u64>,
}

/// Replay failure: the log can no longer reproduce a document.
///
/// These are hard errors, not captured outcomes. A healthy log never
/// produces them; they indicate corruption or a model that drifted from
/// the log it wrote.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("index gap in log: expected {expected}, found {actual}")]
    IndexGap { expected: u64, actual: u64 },

    #[error("corrupt log entry at index {index}: {violation}")]
    CorruptEntry {
        index: u64,
        violation: SchemaViolation,
    },

    #[error("outcome mismatch at index {index}: recorded {recorded}, replayed {replayed}")]
    OutcomeMismatch {
        index: u64,
        recorded: String,
        replayed: String,
    },

    #[error("digest failure during replay: {0}")]
    Digest(#[from] DigestError),
}

/// Summary returned by [`verify_replay`].
///
/// `state_digest` fingerprints the rebuilt shared namespace;
/// `matches_live` compares whole-document digests.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub operations_applied: u64,
    pub operations_rejected: u64,
    #[serde(with = "hash256_hex")]
    pub state_digest: Hash256,
    pub matches_live: bool,
}

/// Rebuild a document from scratch by reapplying the whole log.
pub fn replay<M: DocumentModel>(
    header: DocumentHeader,
    log: &OperationLog,
) -> Result<Document<M>, ReplayError> {
    replay_with(header, log, &ReplayOptions::default())
}

/// Rebuild a document from the first `len` log entries.
pub fn replay_prefix<M: DocumentModel>(
    header: DocumentHeader,
    log: &OperationLog,
    len: u64,
) -> Result<Document<M>, ReplayError> {
    replay_with(header, log, &ReplayOptions { stop_at: Some(len) })
}

pub fn replay_with<M: DocumentModel>(
    header: DocumentHeader,
    log: &OperationLog,
    options: &ReplayOptions,
) -> Result<Document<M>, ReplayError> {
    let limits = GateLimits::unbounded();
    let mut document = Document::<M>::from_parts(
        header,
        M::Shared::default(),
        M::Private::default(),
        OperationLog::new(),
    );

    info!(
        document = %document.id(),
        entries = log.len(),
        stop_at = options.stop_at,
        "replay started"
    );

    for (position, entry) in log.iter().enumerate() {
        let expected = position as u64;
        if let Some(stop) = options.stop_at {
            if expected >= stop {
                break;
            }
        }
        if entry.index != expected {
            return Err(ReplayError::IndexGap {
                expected,
                actual: entry.index,
            });
        }

        let raw = entry.raw_action();
        let outcome = document
            .apply_at(&raw, &limits, entry.recorded_at)
            .map_err(|violation| ReplayError::CorruptEntry {
                index: entry.index,
                violation,
            })?;

        let fresh = match &outcome {
            ApplyOutcome::Applied { .. } => None,
            ApplyOutcome::Rejected { error, .. } => Some(error),
            ApplyOutcome::Skipped { .. } => {
                // A logged entry had a registered handler when it was
                // written; losing it is model drift, not a valid skip.
                return Err(ReplayError::CorruptEntry {
                    index: entry.index,
                    violation: SchemaViolation::Payload {
                        action_type: entry.action_type.clone(),
                        message: "action type no longer registered".to_string(),
                    },
                });
            }
        };

        if entry.error.as_ref() != fresh {
            return Err(ReplayError::OutcomeMismatch {
                index: entry.index,
                recorded: outcome_label(entry.error.as_ref()),
                replayed: outcome_label(fresh),
            });
        }
    }

    let stats = document.log().stats();
    info!(
        document = %document.id(),
        applied = stats.applied,
        rejected = stats.rejected,
        "replay finished"
    );

    Ok(document)
}

/// Replay a live document's own log and compare digests.
pub fn verify_replay<M: DocumentModel>(document: &Document<M>) -> Result<ReplayReport, ReplayError> {
    let rebuilt = replay::<M>(document.header().clone(), document.log())?;
    let stats = rebuilt.log().stats();

    let live = document_digest(document)?;
    let fresh = document_digest(&rebuilt)?;

    Ok(ReplayReport {
        operations_applied: stats.applied,
        operations_rejected: stats.rejected,
        state_digest: state_digest(rebuilt.shared())?,
        matches_live: live == fresh,
    })
}

fn outcome_label(error: Option<&OperationError>) -> String {
    match error {
        None => "applied".to_string(),
        Some(e) => format!("rejected ({})", e.code),
    }
}
