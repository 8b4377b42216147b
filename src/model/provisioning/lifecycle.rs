//! Status machine shared by resource and subscription instances.
//!
//! States: `DRAFT -> PROVISIONING -> ACTIVE <-> SUSPENDED -> TERMINATED`,
//! with `TERMINATED` reachable from any non-terminal state and terminal.
//! Suspension is sub-typed by reason; each resume action pairs with exactly
//! one suspension type. Every transition writes a deterministic field set,
//! and all timestamps arrive in action payloads, never from the clock.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::DomainError;

/// Reason class recorded by a suspension; resumes must match it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuspensionType {
    NonPayment,
    Maintenance,
    Other,
}

impl SuspensionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuspensionType::NonPayment => "NON_PAYMENT",
            SuspensionType::Maintenance => "MAINTENANCE",
            SuspensionType::Other => "OTHER",
        }
    }
}

impl fmt::Display for SuspensionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Instance status; transitions form a directed graph and illegal moves
/// are rejected, never coerced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStatus {
    #[default]
    Draft,
    Provisioning,
    Active,
    Suspended,
    Terminated,
}

impl LifecycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStatus::Draft => "DRAFT",
            LifecycleStatus::Provisioning => "PROVISIONING",
            LifecycleStatus::Active => "ACTIVE",
            LifecycleStatus::Suspended => "SUSPENDED",
            LifecycleStatus::Terminated => "TERMINATED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleStatus::Terminated)
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transition guard failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("invalid status transition: {from} -> {to}")]
    InvalidStatusTransition {
        from: LifecycleStatus,
        to: LifecycleStatus,
    },

    #[error("cannot activate while {status}: provisioning has not completed")]
    ProvisioningNotCompleted { status: LifecycleStatus },

    #[error("invalid suspension type: resume requires {expected}, instance is suspended as {actual}")]
    InvalidSuspensionType {
        expected: SuspensionType,
        actual: SuspensionType,
    },

    #[error("not suspended: status is {status}")]
    NotSuspended { status: LifecycleStatus },

    #[error("already terminated")]
    AlreadyTerminated,
}

impl DomainError for LifecycleError {
    fn code(&self) -> &'static str {
        match self {
            LifecycleError::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            LifecycleError::ProvisioningNotCompleted { .. } => "PROVISIONING_NOT_COMPLETED",
            LifecycleError::InvalidSuspensionType { .. } => "INVALID_SUSPENSION_TYPE",
            LifecycleError::NotSuspended { .. } => "NOT_SUSPENDED",
            LifecycleError::AlreadyTerminated => "ALREADY_TERMINATED",
        }
    }
}

/// Status plus the auxiliary fields each transition sets or clears.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lifecycle {
    pub status: LifecycleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioned_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspension_type: Option<SuspensionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspension_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspension_details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_reason: Option<String>,
}

impl Lifecycle {
    /// `DRAFT -> PROVISIONING`, stamping `provisioning_started_at`.
    pub fn begin_provisioning(&mut self, at: DateTime<Utc>) -> Result<(), LifecycleError> {
        match self.status {
            LifecycleStatus::Draft => {
                self.status = LifecycleStatus::Provisioning;
                self.provisioning_started_at = Some(at);
                Ok(())
            }
            from => Err(LifecycleError::InvalidStatusTransition {
                from,
                to: LifecycleStatus::Provisioning,
            }),
        }
    }

    /// Mark provisioning as finished. The status stays `PROVISIONING`
    /// until an explicit activation; repeating the mark overwrites the
    /// timestamp.
    pub fn complete_provisioning(&mut self, at: DateTime<Utc>) -> Result<(), LifecycleError> {
        match self.status {
            LifecycleStatus::Provisioning => {
                self.provisioned_at = Some(at);
                Ok(())
            }
            from => Err(LifecycleError::InvalidStatusTransition {
                from,
                to: LifecycleStatus::Provisioning,
            }),
        }
    }

    /// `PROVISIONING -> ACTIVE`, legal only once provisioning completed.
    pub fn activate(&mut self, at: DateTime<Utc>) -> Result<(), LifecycleError> {
        match self.status {
            LifecycleStatus::Provisioning if self.provisioned_at.is_some() => {
                self.status = LifecycleStatus::Active;
                self.activated_at = Some(at);
                Ok(())
            }
            LifecycleStatus::Draft | LifecycleStatus::Provisioning => {
                Err(LifecycleError::ProvisioningNotCompleted {
                    status: self.status,
                })
            }
            from => Err(LifecycleError::InvalidStatusTransition {
                from,
                to: LifecycleStatus::Active,
            }),
        }
    }

    /// `ACTIVE -> SUSPENDED`, recording the suspension type and optional
    /// reason/details.
    pub fn suspend(
        &mut self,
        suspension_type: SuspensionType,
        reason: Option<String>,
        details: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        match self.status {
            LifecycleStatus::Active => {
                self.status = LifecycleStatus::Suspended;
                self.suspended_at = Some(at);
                self.suspension_type = Some(suspension_type);
                self.suspension_reason = reason;
                self.suspension_details = details;
                Ok(())
            }
            from => Err(LifecycleError::InvalidStatusTransition {
                from,
                to: LifecycleStatus::Suspended,
            }),
        }
    }

    /// `SUSPENDED -> ACTIVE`, legal only when `expected` matches the
    /// recorded suspension type. Clears all four suspension fields and
    /// nothing else; `activated_at` keeps the first activation.
    ///
    /// A suspension carrying no recorded type behaves as `OTHER`.
    pub fn resume(&mut self, expected: SuspensionType) -> Result<(), LifecycleError> {
        if self.status != LifecycleStatus::Suspended {
            return Err(LifecycleError::NotSuspended {
                status: self.status,
            });
        }
        let actual = self.suspension_type.unwrap_or(SuspensionType::Other);
        if actual != expected {
            return Err(LifecycleError::InvalidSuspensionType { expected, actual });
        }
        self.status = LifecycleStatus::Active;
        self.suspended_at = None;
        self.suspension_type = None;
        self.suspension_reason = None;
        self.suspension_details = None;
        Ok(())
    }

    /// Any non-terminal state `-> TERMINATED`, exactly once.
    pub fn terminate(
        &mut self,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        match self.status {
            LifecycleStatus::Terminated => Err(LifecycleError::AlreadyTerminated),
            _ => {
                self.status = LifecycleStatus::Terminated;
                self.terminated_at = Some(at);
                self.termination_reason = reason;
                Ok(())
            }
        }
    }
}
