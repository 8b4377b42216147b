//! Document Engine Library
//!
//! Deterministic document-state engine: typed actions applied against
//! versioned, scoped in-memory state with an append-only operation log,
//! canonical digests, and full-log replay verification.
//!
//! ## Modules
//!
//! - [`domain`] - Core domain types (documents, actions, the operation log)
//! - [`schema`] - Structural payload validation ahead of dispatch
//! - [`engine`] - Action application and log replay
//! - [`digest`] - Canonical JSON digests over state and log
//! - [`model`] - Document models (offering, provisioning, compliance, workplan)

pub mod digest;
pub mod domain;
pub mod engine;
pub mod model;
pub mod schema;

// Re-export commonly used types
pub use domain::{
    ActionBody, BillingCycle, Collection, DocKind, Document, DocumentHeader, DocumentId,
    DocumentModel, DomainError, Hash256, Keyed, Operation, OperationError, OperationLog, Patch,
    RawAction, Scope,
};

pub use engine::{ApplyOutcome, ReplayError, ReplayOptions, ReplayReport, SkipReason};

pub use schema::{GateLimits, SchemaViolation};
