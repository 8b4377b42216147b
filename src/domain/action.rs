//! Raw action submission envelope.
//!
//! This is the boundary form produced by UI/API callers: a string type tag,
//! the declared target scope, a JSON payload, and optional free-form
//! context. The engine's gate turns it into a model's typed action before
//! any state is touched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Scope;

/// A typed, externally-submitted intent to mutate document state.
///
/// Immutable once constructed; the dispatcher consumes it exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAction {
    /// Discriminated action type tag, e.g. `ADD_SERVICE`.
    #[serde(rename = "type")]
    pub action_type: String,

    /// Namespace the action targets.
    pub scope: Scope,

    /// Payload matching the action type's schema.
    #[serde(default)]
    pub payload: Value,

    /// Free-form caller context, carried verbatim into the log entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl RawAction {
    pub fn new(action_type: impl Into<String>, scope: Scope, payload: Value) -> Self {
        Self {
            action_type: action_type.into(),
            scope,
            payload,
            context: None,
        }
    }

    pub fn shared(action_type: impl Into<String>, payload: Value) -> Self {
        Self::new(action_type, Scope::Shared, payload)
    }

    pub fn private(action_type: impl Into<String>, payload: Value) -> Self {
        Self::new(action_type, Scope::Private, payload)
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}
