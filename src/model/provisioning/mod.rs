//! Provisioning document: resource and subscription instances that move
//! through the shared lifecycle machine.
//!
//! Resources and subscriptions share one instance shape and differ only in
//! which collection they live in; every action names its target collection.
//! The durable namespace holds the instances; the private namespace holds a
//! per-caller status filter.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Collection, DocKind, DocumentModel, DomainError, Keyed, Patch};
use crate::string_id;

mod lifecycle;

pub use lifecycle::*;

string_id! {
    /// Caller-supplied instance identifier, unique per collection.
    InstanceId
}

/// Which collection an instance action targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceTarget {
    Resource,
    Subscription,
}

impl InstanceTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceTarget::Resource => "resource",
            InstanceTarget::Subscription => "subscription",
        }
    }
}

impl fmt::Display for InstanceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A provisioned instance. Created in `DRAFT`; every later mutation goes
/// through a lifecycle transition or a patch-style update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: InstanceId,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub lifecycle: Lifecycle,
}

impl Keyed for Instance {
    type Key = InstanceId;

    fn key(&self) -> &InstanceId {
        &self.id
    }
}

/// Durable namespace of a provisioning document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvisioningShared {
    #[serde(default)]
    pub resources: Collection<Instance>,
    #[serde(default)]
    pub subscriptions: Collection<Instance>,
}

impl ProvisioningShared {
    pub fn collection(&self, target: InstanceTarget) -> &Collection<Instance> {
        match target {
            InstanceTarget::Resource => &self.resources,
            InstanceTarget::Subscription => &self.subscriptions,
        }
    }

    fn collection_mut(&mut self, target: InstanceTarget) -> &mut Collection<Instance> {
        match target {
            InstanceTarget::Resource => &mut self.resources,
            InstanceTarget::Subscription => &mut self.subscriptions,
        }
    }

    pub fn instance(&self, target: InstanceTarget, id: &InstanceId) -> Option<&Instance> {
        self.collection(target).get(id)
    }
}

/// Transient per-caller view state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvisioningView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_filter: Option<LifecycleStatus>,
}

/// Shared-scope actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProvisioningAction {
    AddInstance {
        target: InstanceTarget,
        id: InstanceId,
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },
    UpdateInstance {
        target: InstanceTarget,
        id: InstanceId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        #[serde(default, skip_serializing_if = "Patch::is_keep")]
        notes: Patch<String>,
    },
    BeginProvisioning {
        target: InstanceTarget,
        id: InstanceId,
        at: DateTime<Utc>,
    },
    CompleteProvisioning {
        target: InstanceTarget,
        id: InstanceId,
        at: DateTime<Utc>,
    },
    Activate {
        target: InstanceTarget,
        id: InstanceId,
        at: DateTime<Utc>,
    },
    Suspend {
        target: InstanceTarget,
        id: InstanceId,
        suspension_type: SuspensionType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
        at: DateTime<Utc>,
    },
    ResumeAfterPayment {
        target: InstanceTarget,
        id: InstanceId,
    },
    ResumeAfterMaintenance {
        target: InstanceTarget,
        id: InstanceId,
    },
    Resume {
        target: InstanceTarget,
        id: InstanceId,
    },
    Terminate {
        target: InstanceTarget,
        id: InstanceId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        at: DateTime<Utc>,
    },
}

/// Private-scope actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProvisioningViewAction {
    SetStatusFilter { status: LifecycleStatus },
    ClearStatusFilter,
}

/// Domain errors for provisioning documents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisioningError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("{target} instance not found: {id}")]
    InstanceNotFound {
        target: InstanceTarget,
        id: InstanceId,
    },

    #[error("duplicate {target} instance: {id}")]
    DuplicateInstance {
        target: InstanceTarget,
        id: InstanceId,
    },

    #[error("{target} instance already terminated: {id}")]
    InstanceTerminated {
        target: InstanceTarget,
        id: InstanceId,
    },
}

impl DomainError for ProvisioningError {
    fn code(&self) -> &'static str {
        match self {
            ProvisioningError::Lifecycle(inner) => inner.code(),
            ProvisioningError::InstanceNotFound { .. } => "INSTANCE_NOT_FOUND",
            ProvisioningError::DuplicateInstance { .. } => "DUPLICATE_INSTANCE",
            ProvisioningError::InstanceTerminated { .. } => "INSTANCE_TERMINATED",
        }
    }
}

fn with_lifecycle<F>(
    state: &mut ProvisioningShared,
    target: InstanceTarget,
    id: &InstanceId,
    transition: F,
) -> Result<(), ProvisioningError>
where
    F: FnOnce(&mut Lifecycle) -> Result<(), LifecycleError>,
{
    let instance = state
        .collection_mut(target)
        .get_mut(id)
        .ok_or_else(|| ProvisioningError::InstanceNotFound {
            target,
            id: id.clone(),
        })?;
    transition(&mut instance.lifecycle)?;
    Ok(())
}

/// Provisioning document model.
pub struct ProvisioningModel;

impl DocumentModel for ProvisioningModel {
    type Shared = ProvisioningShared;
    type Private = ProvisioningView;
    type SharedAction = ProvisioningAction;
    type PrivateAction = ProvisioningViewAction;
    type Error = ProvisioningError;

    const KIND: DocKind = DocKind::Provisioning;

    fn shared_action_types() -> &'static [&'static str] {
        &[
            "ADD_INSTANCE",
            "UPDATE_INSTANCE",
            "BEGIN_PROVISIONING",
            "COMPLETE_PROVISIONING",
            "ACTIVATE",
            "SUSPEND",
            "RESUME_AFTER_PAYMENT",
            "RESUME_AFTER_MAINTENANCE",
            "RESUME",
            "TERMINATE",
        ]
    }

    fn private_action_types() -> &'static [&'static str] {
        &["SET_STATUS_FILTER", "CLEAR_STATUS_FILTER"]
    }

    fn apply_shared(
        state: &mut Self::Shared,
        action: &Self::SharedAction,
    ) -> Result<(), Self::Error> {
        match action {
            ProvisioningAction::AddInstance {
                target,
                id,
                label,
                notes,
            } => {
                let instance = Instance {
                    id: id.clone(),
                    label: label.clone(),
                    notes: notes.clone(),
                    lifecycle: Lifecycle::default(),
                };
                state
                    .collection_mut(*target)
                    .insert(instance)
                    .map_err(|duplicate| ProvisioningError::DuplicateInstance {
                        target: *target,
                        id: duplicate.id,
                    })
            }
            ProvisioningAction::UpdateInstance {
                target,
                id,
                label,
                notes,
            } => {
                let instance = state.collection_mut(*target).get_mut(id).ok_or_else(|| {
                    ProvisioningError::InstanceNotFound {
                        target: *target,
                        id: id.clone(),
                    }
                })?;
                if instance.lifecycle.status.is_terminal() {
                    return Err(ProvisioningError::InstanceTerminated {
                        target: *target,
                        id: id.clone(),
                    });
                }
                if let Some(label) = label {
                    instance.label = label.clone();
                }
                notes.apply_to(&mut instance.notes);
                Ok(())
            }
            ProvisioningAction::BeginProvisioning { target, id, at } => {
                with_lifecycle(state, *target, id, |lc| lc.begin_provisioning(*at))
            }
            ProvisioningAction::CompleteProvisioning { target, id, at } => {
                with_lifecycle(state, *target, id, |lc| lc.complete_provisioning(*at))
            }
            ProvisioningAction::Activate { target, id, at } => {
                with_lifecycle(state, *target, id, |lc| lc.activate(*at))
            }
            ProvisioningAction::Suspend {
                target,
                id,
                suspension_type,
                reason,
                details,
                at,
            } => with_lifecycle(state, *target, id, |lc| {
                lc.suspend(*suspension_type, reason.clone(), details.clone(), *at)
            }),
            ProvisioningAction::ResumeAfterPayment { target, id } => {
                with_lifecycle(state, *target, id, |lc| {
                    lc.resume(SuspensionType::NonPayment)
                })
            }
            ProvisioningAction::ResumeAfterMaintenance { target, id } => {
                with_lifecycle(state, *target, id, |lc| {
                    lc.resume(SuspensionType::Maintenance)
                })
            }
            ProvisioningAction::Resume { target, id } => {
                with_lifecycle(state, *target, id, |lc| lc.resume(SuspensionType::Other))
            }
            ProvisioningAction::Terminate {
                target,
                id,
                reason,
                at,
            } => with_lifecycle(state, *target, id, |lc| lc.terminate(reason.clone(), *at)),
        }
    }

    fn apply_private(
        state: &mut Self::Private,
        action: &Self::PrivateAction,
    ) -> Result<(), Self::Error> {
        match action {
            ProvisioningViewAction::SetStatusFilter { status } => {
                state.status_filter = Some(*status);
                Ok(())
            }
            ProvisioningViewAction::ClearStatusFilter => {
                state.status_filter = None;
                Ok(())
            }
        }
    }
}
