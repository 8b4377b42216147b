//! Canonical digests with domain separation.
//!
//! Snapshot fingerprints for the persistence boundary and for replay
//! verification:
//! - RFC 8785 JSON Canonicalization Scheme (JCS) over the serialized value
//! - Domain separation prefixes per digest kind
//! - "Bit-for-bit" replay equality is expressed as digest equality
//!
//! Uses `serde_json_canonicalizer` for RFC 8785 compliance: lexicographic
//! UTF-8 key ordering, ES6 number serialization, proper Unicode handling.

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::domain::{Document, DocumentModel, Hash256, OperationLog};

// ============================================================================
// Domain Separation Constants
// ============================================================================

/// Domain prefix for namespace state digests
pub const DOMAIN_STATE: &[u8] = b"DSE_STATE_V1";

/// Domain prefix for operation log digests
pub const DOMAIN_OPLOG: &[u8] = b"DSE_OPLOG_V1";

/// Domain prefix for whole-document digests (header + both namespaces + log)
pub const DOMAIN_DOC: &[u8] = b"DSE_DOC_V1";

/// Digest computation failure.
///
/// Engine state never contains NaN or Infinity (payloads arrive as JSON,
/// which cannot encode them), so these surface only on foreign `Serialize`
/// impls passed to [`state_digest`].
#[derive(Debug, Error)]
pub enum DigestError {
    #[error("value not serializable: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("canonicalization failed: {0}")]
    Canonicalize(String),
}

fn hash_with_domain(domain: &[u8], value: &serde_json::Value) -> Result<Hash256, DigestError> {
    let canonical = serde_json_canonicalizer::to_string(value)
        .map_err(|e| DigestError::Canonicalize(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(canonical.as_bytes());
    Ok(hasher.finalize().into())
}

/// Digest of a single namespace (or any serializable state snapshot).
///
/// `state_digest = SHA256(b"DSE_STATE_V1" || JCS(state))`
pub fn state_digest<S: Serialize>(state: &S) -> Result<Hash256, DigestError> {
    let value = serde_json::to_value(state)?;
    hash_with_domain(DOMAIN_STATE, &value)
}

/// Digest of the append-only operation log.
///
/// `log_digest = SHA256(b"DSE_OPLOG_V1" || JCS(entries))`
pub fn log_digest(log: &OperationLog) -> Result<Hash256, DigestError> {
    let value = serde_json::to_value(log)?;
    hash_with_domain(DOMAIN_OPLOG, &value)
}

/// Digest of a whole document: header, shared and private namespaces, log.
///
/// `document_digest = SHA256(b"DSE_DOC_V1" || JCS(document))`
pub fn document_digest<M: DocumentModel>(document: &Document<M>) -> Result<Hash256, DigestError> {
    let value = serde_json::to_value(document)?;
    hash_with_domain(DOMAIN_DOC, &value)
}

/// Lowercase hex rendering of a digest.
pub fn to_hex(hash: &Hash256) -> String {
    hex::encode(hash)
}
