//! Schema gate: structural validation at the action boundary.
//!
//! The gate runs before any reducer sees an action: it enforces the payload
//! size ceiling, resolves the declared scope against the model's registered
//! action types, and decodes the raw payload into the model's typed action.
//! Gate rejections never produce a log entry; the document is untouched.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;

use crate::domain::Scope;

/// Default payload ceiling, in serialized bytes.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 256 * 1024;

/// Structural violation caught at the gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    /// Payload shape does not match the schema for its action type.
    #[error("invalid payload for {action_type}: {message}")]
    Payload {
        action_type: String,
        message: String,
    },

    /// Declared scope disagrees with the scope the action type is
    /// registered in.
    #[error("scope mismatch for {action_type}: registered {registered}, submitted {submitted}")]
    ScopeMismatch {
        action_type: String,
        registered: Scope,
        submitted: Scope,
    },

    /// Serialized payload exceeds the configured ceiling.
    #[error("payload too large: {size} bytes exceeds limit of {limit}")]
    PayloadTooLarge { size: usize, limit: usize },
}

/// Boundary limits enforced by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateLimits {
    /// Ceiling on the serialized payload size, in bytes; `None` disables
    /// the check.
    pub max_payload_bytes: Option<usize>,
}

impl Default for GateLimits {
    fn default() -> Self {
        Self {
            max_payload_bytes: Some(DEFAULT_MAX_PAYLOAD_BYTES),
        }
    }
}

impl GateLimits {
    /// Limits that accept any payload. Replay runs with these: entries
    /// already in the log passed the gate when first applied.
    pub fn unbounded() -> Self {
        Self {
            max_payload_bytes: None,
        }
    }

    pub fn check_payload_size(&self, payload: &Value) -> Result<(), SchemaViolation> {
        let limit = match self.max_payload_bytes {
            Some(limit) => limit,
            None => return Ok(()),
        };
        let size = payload.to_string().len();
        if size > limit {
            return Err(SchemaViolation::PayloadTooLarge { size, limit });
        }
        Ok(())
    }
}

/// Decode a raw payload into a typed action through its adjacently tagged
/// wire form `{type, payload}`.
pub fn decode_action<A: DeserializeOwned>(
    action_type: &str,
    payload: &Value,
) -> Result<A, SchemaViolation> {
    let envelope = json!({ "type": action_type, "payload": payload });
    serde_json::from_value(envelope).map_err(|e| SchemaViolation::Payload {
        action_type: action_type.to_string(),
        message: e.to_string(),
    })
}
