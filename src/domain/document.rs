//! Documents and the model seam.
//!
//! A [`Document`] owns one shared and one private namespace plus the
//! operation log; a [`DocumentModel`] plugs a concrete entity schema and
//! its transition rules into the engine. Models differ only in their
//! schemas and rules, never in engine mechanics.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{DocKind, DocumentId, DomainError, OperationLog, Scope};

/// Immutable document identity, written once by the factory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentHeader {
    pub id: DocumentId,
    pub kind: DocKind,
    pub created_at: DateTime<Utc>,
}

impl DocumentHeader {
    pub fn new(id: DocumentId, kind: DocKind, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            kind,
            created_at,
        }
    }
}

/// Entity schemas and transition rules for one kind of document.
///
/// Handlers are pure: they never read the ambient clock or perform I/O, and
/// they see only the namespace their action targets. A handler returning
/// `Err` must leave no observable effect; the engine guarantees this by
/// running handlers against a scratch copy of the namespace.
pub trait DocumentModel {
    /// Durable namespace.
    type Shared: Clone + Default + PartialEq + fmt::Debug + Serialize + DeserializeOwned;
    /// Transient namespace.
    type Private: Clone + Default + PartialEq + fmt::Debug + Serialize + DeserializeOwned;
    /// Closed action set for the shared namespace, adjacently tagged as
    /// `{type, payload}` on the wire.
    type SharedAction: Clone + fmt::Debug + Serialize + DeserializeOwned;
    /// Closed action set for the private namespace.
    type PrivateAction: Clone + fmt::Debug + Serialize + DeserializeOwned;
    /// Domain errors this model's handlers can return.
    type Error: DomainError;

    /// Document-type tag stamped into headers.
    const KIND: DocKind;

    /// Action type tags accepted in the shared namespace.
    fn shared_action_types() -> &'static [&'static str];

    /// Action type tags accepted in the private namespace.
    fn private_action_types() -> &'static [&'static str];

    fn apply_shared(state: &mut Self::Shared, action: &Self::SharedAction)
        -> Result<(), Self::Error>;

    fn apply_private(
        state: &mut Self::Private,
        action: &Self::PrivateAction,
    ) -> Result<(), Self::Error>;

    /// Scope an action type belongs to, or `None` for unregistered types.
    fn action_scope(action_type: &str) -> Option<Scope> {
        if Self::shared_action_types().contains(&action_type) {
            Some(Scope::Shared)
        } else if Self::private_action_types().contains(&action_type) {
            Some(Scope::Private)
        } else {
            None
        }
    }
}

/// Scope-typed action for in-process submission, bypassing the string
/// boundary while still flowing through the same dispatch path.
pub enum ActionBody<M: DocumentModel> {
    Shared(M::SharedAction),
    Private(M::PrivateAction),
}

impl<M: DocumentModel> ActionBody<M> {
    pub fn scope(&self) -> Scope {
        match self {
            ActionBody::Shared(_) => Scope::Shared,
            ActionBody::Private(_) => Scope::Private,
        }
    }
}

impl<M: DocumentModel> Clone for ActionBody<M> {
    fn clone(&self) -> Self {
        match self {
            ActionBody::Shared(action) => ActionBody::Shared(action.clone()),
            ActionBody::Private(action) => ActionBody::Private(action.clone()),
        }
    }
}

impl<M: DocumentModel> fmt::Debug for ActionBody<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionBody::Shared(action) => f.debug_tuple("Shared").field(action).finish(),
            ActionBody::Private(action) => f.debug_tuple("Private").field(action).finish(),
        }
    }
}

/// The root unit of state: header, two scoped namespaces, and the log.
///
/// Created once via [`Document::new`], which seeds both namespaces from the
/// model's defaults; mutated only by applying actions.
#[derive(Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
pub struct Document<M: DocumentModel> {
    pub(crate) header: DocumentHeader,
    pub(crate) shared: M::Shared,
    pub(crate) private: M::Private,
    pub(crate) log: OperationLog,
}

impl<M: DocumentModel> Document<M> {
    /// Factory: a fresh document with default state and an empty log.
    pub fn new(id: DocumentId, created_at: DateTime<Utc>) -> Self {
        Self {
            header: DocumentHeader::new(id, M::KIND, created_at),
            shared: M::Shared::default(),
            private: M::Private::default(),
            log: OperationLog::new(),
        }
    }

    /// Reassemble a document from previously serialized parts. The header's
    /// kind must match `M::KIND`; this is the persistence boundary and the
    /// stored header is trusted.
    pub fn from_parts(
        header: DocumentHeader,
        shared: M::Shared,
        private: M::Private,
        log: OperationLog,
    ) -> Self {
        debug_assert_eq!(header.kind, M::KIND);
        Self {
            header,
            shared,
            private,
            log,
        }
    }

    pub fn header(&self) -> &DocumentHeader {
        &self.header
    }

    pub fn id(&self) -> &DocumentId {
        &self.header.id
    }

    pub fn shared(&self) -> &M::Shared {
        &self.shared
    }

    pub fn private(&self) -> &M::Private {
        &self.private
    }

    pub fn log(&self) -> &OperationLog {
        &self.log
    }
}

impl<M: DocumentModel> Clone for Document<M> {
    fn clone(&self) -> Self {
        Self {
            header: self.header.clone(),
            shared: self.shared.clone(),
            private: self.private.clone(),
            log: self.log.clone(),
        }
    }
}

impl<M: DocumentModel> PartialEq for Document<M> {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header
            && self.shared == other.shared
            && self.private == other.private
            && self.log == other.log
    }
}

impl<M: DocumentModel> fmt::Debug for Document<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("header", &self.header)
            .field("shared", &self.shared)
            .field("private", &self.private)
            .field("log", &self.log)
            .finish()
    }
}
