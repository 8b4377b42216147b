//! Reducer dispatch: the apply path from submitted action to logged outcome.
//!
//! `apply` is the single write path for a document. The sequence is fixed:
//! gate checks (size, scope, payload decode), handler execution against a
//! scratch copy of the targeted namespace, commit or discard, then one new
//! log entry at `index = previous length`. Gate rejections surface as
//! `Err(SchemaViolation)` and never occupy a log slot; domain rejections are
//! captured into the entry and returned as a normal outcome.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::domain::{
    ActionBody, Document, DocumentModel, Operation, OperationError, RawAction, Scope,
};
use crate::schema::{decode_action, GateLimits, SchemaViolation};

mod replay;

pub use replay::*;

/// Why an action left the document untouched without being an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No handler is registered for the action type in either namespace.
    UnknownActionType { action_type: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnknownActionType { action_type } => {
                write!(f, "unknown action type {action_type}")
            }
        }
    }
}

/// Outcome of applying one action.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// The handler ran and its namespace was committed; the log entry sits
    /// at `index`.
    Applied { index: u64 },
    /// The handler refused with a domain error; state is unchanged and the
    /// error is captured in the log entry at `index`.
    Rejected { index: u64, error: OperationError },
    /// No handler matched; state and log are both unchanged.
    Skipped { reason: SkipReason },
}

impl ApplyOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied { .. })
    }

    /// Log index of the new entry, if one was written.
    pub fn index(&self) -> Option<u64> {
        match self {
            ApplyOutcome::Applied { index } => Some(*index),
            ApplyOutcome::Rejected { index, .. } => Some(*index),
            ApplyOutcome::Skipped { .. } => None,
        }
    }

    /// Captured domain error, if the action was rejected.
    pub fn error(&self) -> Option<&OperationError> {
        match self {
            ApplyOutcome::Rejected { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl<M: DocumentModel> Document<M> {
    /// Apply a raw action with default gate limits, stamping `recorded_at`
    /// from the wall clock. The clock only feeds log metadata; handlers
    /// never see it.
    pub fn apply(&mut self, action: &RawAction) -> Result<ApplyOutcome, SchemaViolation> {
        self.apply_with_limits(action, &GateLimits::default())
    }

    pub fn apply_with_limits(
        &mut self,
        action: &RawAction,
        limits: &GateLimits,
    ) -> Result<ApplyOutcome, SchemaViolation> {
        self.apply_at(action, limits, Utc::now())
    }

    /// Apply a typed action, bypassing the string boundary for in-process
    /// callers. Dispatch, rollback, and logging are identical to the raw
    /// path; the log entry records the action's wire form.
    pub fn apply_typed(&mut self, action: &ActionBody<M>) -> Result<ApplyOutcome, SchemaViolation> {
        let (action_type, payload) = encode_body(action)?;
        let error = match action {
            ActionBody::Shared(typed) => self.run_shared(typed),
            ActionBody::Private(typed) => self.run_private(typed),
        };
        Ok(self.record(action.scope(), &action_type, payload, None, Utc::now(), error))
    }

    /// Core apply path; replay calls this directly to carry each entry's
    /// original `recorded_at` verbatim.
    pub(crate) fn apply_at(
        &mut self,
        action: &RawAction,
        limits: &GateLimits,
        recorded_at: DateTime<Utc>,
    ) -> Result<ApplyOutcome, SchemaViolation> {
        limits.check_payload_size(&action.payload)?;

        let registered = match M::action_scope(&action.action_type) {
            Some(scope) => scope,
            None => {
                trace!(
                    document = %self.header.id,
                    action = %action.action_type,
                    "skipping unregistered action type"
                );
                return Ok(ApplyOutcome::Skipped {
                    reason: SkipReason::UnknownActionType {
                        action_type: action.action_type.clone(),
                    },
                });
            }
        };

        if registered != action.scope {
            return Err(SchemaViolation::ScopeMismatch {
                action_type: action.action_type.clone(),
                registered,
                submitted: action.scope,
            });
        }

        // Decode before running anything: a malformed payload is a gate
        // rejection and must not occupy a log slot.
        let error = match registered {
            Scope::Shared => {
                let typed: M::SharedAction = decode_action(&action.action_type, &action.payload)?;
                self.run_shared(&typed)
            }
            Scope::Private => {
                let typed: M::PrivateAction = decode_action(&action.action_type, &action.payload)?;
                self.run_private(&typed)
            }
        };

        Ok(self.record(
            registered,
            &action.action_type,
            action.payload.clone(),
            action.context.clone(),
            recorded_at,
            error,
        ))
    }

    // Handlers run against a scratch copy; a domain error discards the copy
    // so no partial mutation escapes.
    fn run_shared(&mut self, action: &M::SharedAction) -> Option<OperationError> {
        let mut scratch = self.shared.clone();
        match M::apply_shared(&mut scratch, action) {
            Ok(()) => {
                self.shared = scratch;
                None
            }
            Err(e) => Some(OperationError::from_domain(&e)),
        }
    }

    fn run_private(&mut self, action: &M::PrivateAction) -> Option<OperationError> {
        let mut scratch = self.private.clone();
        match M::apply_private(&mut scratch, action) {
            Ok(()) => {
                self.private = scratch;
                None
            }
            Err(e) => Some(OperationError::from_domain(&e)),
        }
    }

    fn record(
        &mut self,
        scope: Scope,
        action_type: &str,
        payload: Value,
        context: Option<Value>,
        recorded_at: DateTime<Utc>,
        error: Option<OperationError>,
    ) -> ApplyOutcome {
        let index = self.log.next_index();
        match &error {
            None => debug!(
                document = %self.header.id,
                action = action_type,
                scope = %scope,
                index,
                "action applied"
            ),
            Some(e) => warn!(
                document = %self.header.id,
                action = action_type,
                scope = %scope,
                index,
                code = %e.code,
                "action rejected"
            ),
        }

        self.log.append(Operation {
            index,
            scope,
            action_type: action_type.to_string(),
            payload,
            context,
            recorded_at,
            error: error.clone(),
        });

        match error {
            None => ApplyOutcome::Applied { index },
            Some(error) => ApplyOutcome::Rejected { index, error },
        }
    }
}

/// Split a typed action into its wire form `(type, payload)`.
fn encode_body<M: DocumentModel>(action: &ActionBody<M>) -> Result<(String, Value), SchemaViolation> {
    let encoded = match action {
        ActionBody::Shared(typed) => serde_json::to_value(typed),
        ActionBody::Private(typed) => serde_json::to_value(typed),
    }
    .map_err(|e| SchemaViolation::Payload {
        action_type: "TYPED_ACTION".to_string(),
        message: e.to_string(),
    })?;

    match encoded {
        Value::Object(mut map) => {
            let action_type = match map.remove("type") {
                Some(Value::String(tag)) => tag,
                _ => {
                    return Err(SchemaViolation::Payload {
                        action_type: "TYPED_ACTION".to_string(),
                        message: "typed action is missing its type tag".to_string(),
                    })
                }
            };
            let payload = map.remove("payload").unwrap_or(Value::Null);
            Ok((action_type, payload))
        }
        _ => Err(SchemaViolation::Payload {
            action_type: "TYPED_ACTION".to_string(),
            message: "typed action did not encode as a tagged object".to_string(),
        }),
    }
}
