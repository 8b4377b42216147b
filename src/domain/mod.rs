//! Domain types for the document engine.
//!
//! Core types for documents, scoped namespaces, typed actions, and the
//! append-only operation log.

mod action;
mod collection;
mod document;
mod operation;
mod patch;
mod types;

pub use action::*;
pub use collection::*;
pub use document::*;
pub use operation::*;
pub use patch::*;
pub use types::*;
