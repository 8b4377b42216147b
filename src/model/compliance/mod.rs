//! Compliance document: multisig agreement plus an auditable event trail.
//!
//! The agreement is a small state machine (DRAFT until enough signatures,
//! then EXECUTED, then optionally TERMINATED). Termination freezes agreement
//! content; compliance events are observations about the outside world and
//! stay recordable afterwards. Amendments never edit an event in place, they
//! chain a new version onto the old one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Collection, DocKind, DocumentModel, DomainError, Keyed, Patch};
use crate::string_id;

mod sla;

pub use sla::*;

string_id! {
    /// Signer identifier.
    SignerId
}

string_id! {
    /// Compliance-event identifier.
    EventId
}

/// Agreement lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgreementStatus {
    #[default]
    Draft,
    Executed,
    Terminated,
}

impl AgreementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgreementStatus::Draft => "DRAFT",
            AgreementStatus::Executed => "EXECUTED",
            AgreementStatus::Terminated => "TERMINATED",
        }
    }
}

impl std::fmt::Display for AgreementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A party expected to sign the agreement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signer {
    pub id: SignerId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Keyed for Signer {
    type Key = SignerId;

    fn key(&self) -> &SignerId {
        &self.id
    }
}

/// One recorded signature. At most one per signer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub signer: SignerId,
    pub signed_at: DateTime<Utc>,
}

/// The agreement under signature collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultisigAgreement {
    #[serde(default)]
    pub status: AgreementStatus,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub governing_law: Option<String>,
    /// Signature threshold; zero means no threshold has been set yet.
    #[serde(default)]
    pub required_signatures: u32,
    #[serde(default)]
    pub signers: Collection<Signer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signatures: Vec<SignatureRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_reason: Option<String>,
}

impl MultisigAgreement {
    fn ensure_not_terminated(&self) -> Result<(), ComplianceError> {
        match self.status {
            AgreementStatus::Terminated => Err(ComplianceError::AgreementTerminated),
            _ => Ok(()),
        }
    }
}

/// An observed compliance event. Amended versions link both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceEvent {
    pub id: EventId,
    pub event_type: String,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sla_deadline_hours: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sla_deadline_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sla_breached: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<EventId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<EventId>,
}

impl Keyed for ComplianceEvent {
    type Key = EventId;

    fn key(&self) -> &EventId {
        &self.id
    }
}

/// Durable namespace of a compliance document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplianceShared {
    #[serde(default)]
    pub agreement: MultisigAgreement,
    #[serde(default)]
    pub events: Collection<ComplianceEvent>,
}

/// Transient per-caller view state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplianceView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_event: Option<EventId>,
    #[serde(default)]
    pub show_superseded: bool,
}

/// Shared-scope actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceAction {
    AddSigner {
        id: SignerId,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        role: Option<String>,
    },
    RemoveSigner {
        id: SignerId,
    },
    RecordSignature {
        signer: SignerId,
        signed_at: DateTime<Utc>,
    },
    UpdateProcessDetails {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Patch::is_keep")]
        governing_law: Patch<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        required_signatures: Option<u32>,
    },
    TerminateAgreement {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        at: DateTime<Utc>,
    },
    AddComplianceEvent {
        id: EventId,
        event_type: String,
        description: String,
        occurred_at: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sla_deadline_hours: Option<u32>,
    },
    AmendComplianceEvent {
        /// The event being superseded.
        target: EventId,
        id: EventId,
        event_type: String,
        description: String,
        occurred_at: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sla_deadline_hours: Option<u32>,
    },
    MarkSlaBreached {
        id: EventId,
    },
}

/// Private-scope actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceViewAction {
    SelectEvent {
        /// Absent or null clears the selection.
        #[serde(default)]
        event: Option<EventId>,
    },
    SetShowSuperseded {
        show: bool,
    },
}

/// Domain errors for compliance documents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComplianceError {
    #[error("agreement is terminated")]
    AgreementTerminated,
    #[error("signer not found: {id}")]
    SignerNotFound { id: SignerId },
    #[error("duplicate signer: {id}")]
    DuplicateSigner { id: SignerId },
    #[error("signer {id} has already signed")]
    SignerAlreadySigned { id: SignerId },
    #[error("compliance event not found: {id}")]
    EventNotFound { id: EventId },
    #[error("duplicate compliance event: {id}")]
    DuplicateEvent { id: EventId },
    #[error("compliance event {id} already superseded by {by}")]
    EventAlreadySuperseded { id: EventId, by: EventId },
}

impl DomainError for ComplianceError {
    fn code(&self) -> &'static str {
        match self {
            ComplianceError::AgreementTerminated => "AGREEMENT_TERMINATED",
            ComplianceError::SignerNotFound { .. } => "SIGNER_NOT_FOUND",
            ComplianceError::DuplicateSigner { .. } => "DUPLICATE_SIGNER",
            ComplianceError::SignerAlreadySigned { .. } => "SIGNER_ALREADY_SIGNED",
            ComplianceError::EventNotFound { .. } => "EVENT_NOT_FOUND",
            ComplianceError::DuplicateEvent { .. } => "DUPLICATE_EVENT",
            ComplianceError::EventAlreadySuperseded { .. } => "EVENT_ALREADY_SUPERSEDED",
        }
    }
}

fn build_event(
    id: &EventId,
    event_type: &str,
    description: &str,
    occurred_at: DateTime<Utc>,
    sla_deadline_hours: Option<u32>,
    supersedes: Option<EventId>,
) -> ComplianceEvent {
    ComplianceEvent {
        id: id.clone(),
        event_type: event_type.to_string(),
        description: description.to_string(),
        occurred_at,
        sla_deadline_hours,
        sla_deadline_at: sla_deadline(occurred_at, sla_deadline_hours),
        sla_breached: false,
        supersedes,
        superseded_by: None,
    }
}

/// Compliance document model.
pub struct ComplianceModel;

impl DocumentModel for ComplianceModel {
    type Shared = ComplianceShared;
    type Private = ComplianceView;
    type SharedAction = ComplianceAction;
    type PrivateAction = ComplianceViewAction;
    type Error = ComplianceError;

    const KIND: DocKind = DocKind::Compliance;

    fn shared_action_types() -> &'static [&'static str] {
        &[
            "ADD_SIGNER",
            "REMOVE_SIGNER",
            "RECORD_SIGNATURE",
            "UPDATE_PROCESS_DETAILS",
            "TERMINATE_AGREEMENT",
            "ADD_COMPLIANCE_EVENT",
            "AMEND_COMPLIANCE_EVENT",
            "MARK_SLA_BREACHED",
        ]
    }

    fn private_action_types() -> &'static [&'static str] {
        &["SELECT_EVENT", "SET_SHOW_SUPERSEDED"]
    }

    fn apply_shared(
        state: &mut Self::Shared,
        action: &Self::SharedAction,
    ) -> Result<(), Self::Error> {
        match action {
            ComplianceAction::AddSigner { id, name, role } => {
                state.agreement.ensure_not_terminated()?;
                state
                    .agreement
                    .signers
                    .insert(Signer {
                        id: id.clone(),
                        name: name.clone(),
                        role: role.clone(),
                    })
                    .map_err(|dup| ComplianceError::DuplicateSigner { id: dup.id })
            }
            ComplianceAction::RemoveSigner { id } => {
                state.agreement.ensure_not_terminated()?;
                state
                    .agreement
                    .signers
                    .remove(id)
                    .ok_or_else(|| ComplianceError::SignerNotFound { id: id.clone() })?;
                // A removed party's signature no longer counts.
                state
                    .agreement
                    .signatures
                    .retain(|record| &record.signer != id);
                Ok(())
            }
            ComplianceAction::RecordSignature { signer, signed_at } => {
                let agreement = &mut state.agreement;
                agreement.ensure_not_terminated()?;
                if !agreement.signers.contains(signer) {
                    return Err(ComplianceError::SignerNotFound { id: signer.clone() });
                }
                if agreement
                    .signatures
                    .iter()
                    .any(|record| &record.signer == signer)
                {
                    return Err(ComplianceError::SignerAlreadySigned { id: signer.clone() });
                }
                agreement.signatures.push(SignatureRecord {
                    signer: signer.clone(),
                    signed_at: *signed_at,
                });
                if agreement.required_signatures > 0
                    && agreement.signatures.len() as u32 >= agreement.required_signatures
                    && agreement.status == AgreementStatus::Draft
                {
                    agreement.status = AgreementStatus::Executed;
                }
                Ok(())
            }
            ComplianceAction::UpdateProcessDetails {
                title,
                governing_law,
                required_signatures,
            } => {
                let agreement = &mut state.agreement;
                agreement.ensure_not_terminated()?;
                if let Some(title) = title {
                    agreement.title = title.clone();
                }
                governing_law.apply_to(&mut agreement.governing_law);
                if let Some(required) = required_signatures {
                    agreement.required_signatures = *required;
                }
                Ok(())
            }
            ComplianceAction::TerminateAgreement { reason, at } => {
                let agreement = &mut state.agreement;
                agreement.ensure_not_terminated()?;
                agreement.status = AgreementStatus::Terminated;
                agreement.terminated_at = Some(*at);
                agreement.termination_reason = reason.clone();
                Ok(())
            }
            ComplianceAction::AddComplianceEvent {
                id,
                event_type,
                description,
                occurred_at,
                sla_deadline_hours,
            } => state
                .events
                .insert(build_event(
                    id,
                    event_type,
                    description,
                    *occurred_at,
                    *sla_deadline_hours,
                    None,
                ))
                .map_err(|dup| ComplianceError::DuplicateEvent { id: dup.id }),
            ComplianceAction::AmendComplianceEvent {
                target,
                id,
                event_type,
                description,
                occurred_at,
                sla_deadline_hours,
            } => {
                match state.events.get(target) {
                    None => {
                        return Err(ComplianceError::EventNotFound { id: target.clone() });
                    }
                    Some(prior) => {
                        if let Some(by) = &prior.superseded_by {
                            return Err(ComplianceError::EventAlreadySuperseded {
                                id: target.clone(),
                                by: by.clone(),
                            });
                        }
                    }
                }
                state
                    .events
                    .insert(build_event(
                        id,
                        event_type,
                        description,
                        *occurred_at,
                        *sla_deadline_hours,
                        Some(target.clone()),
                    ))
                    .map_err(|dup| ComplianceError::DuplicateEvent { id: dup.id })?;
                if let Some(prior) = state.events.get_mut(target) {
                    prior.superseded_by = Some(id.clone());
                }
                Ok(())
            }
            ComplianceAction::MarkSlaBreached { id } => {
                let event = state
                    .events
                    .get_mut(id)
                    .ok_or_else(|| ComplianceError::EventNotFound { id: id.clone() })?;
                // Idempotent flag set.
                event.sla_breached = true;
                Ok(())
            }
        }
    }

    fn apply_private(
        state: &mut Self::Private,
        action: &Self::PrivateAction,
    ) -> Result<(), Self::Error> {
        match action {
            ComplianceViewAction::SelectEvent { event } => {
                state.selected_event = event.clone();
                Ok(())
            }
            ComplianceViewAction::SetShowSuperseded { show } => {
                state.show_superseded = *show;
                Ok(())
            }
        }
    }
}
