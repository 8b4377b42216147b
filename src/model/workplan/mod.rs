//! Workplan document: ordered steps with dependent tasks and prerequisites.
//!
//! Steps own their display order; tasks and prerequisites hang off a step
//! and are removed with it. Reordering takes a full id permutation, a
//! partial or padded list is refused without touching the current order.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Collection, DocKind, DocumentModel, DomainError, Keyed, Patch};
use crate::string_id;

string_id! {
    /// Step identifier.
    StepId
}

string_id! {
    /// Task identifier.
    TaskId
}

string_id! {
    /// Prerequisite identifier.
    PrerequisiteId
}

/// One phase of the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Keyed for Step {
    type Key = StepId;

    fn key(&self) -> &StepId {
        &self.id
    }
}

/// A unit of work within a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub step: StepId,
    pub name: String,
    #[serde(default)]
    pub done: bool,
}

impl Keyed for Task {
    type Key = TaskId;

    fn key(&self) -> &TaskId {
        &self.id
    }
}

/// Something that must hold before a step can run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prerequisite {
    pub id: PrerequisiteId,
    pub step: StepId,
    pub description: String,
}

impl Keyed for Prerequisite {
    type Key = PrerequisiteId;

    fn key(&self) -> &PrerequisiteId {
        &self.id
    }
}

/// Durable namespace of a workplan document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkplanShared {
    #[serde(default)]
    pub steps: Collection<Step>,
    #[serde(default)]
    pub tasks: Collection<Task>,
    #[serde(default)]
    pub prerequisites: Collection<Prerequisite>,
}

/// Transient per-caller view state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkplanView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_step: Option<StepId>,
}

/// Shared-scope actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkplanAction {
    AddStep {
        id: StepId,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    UpdateStep {
        id: StepId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Patch::is_keep")]
        description: Patch<String>,
    },
    RemoveStep {
        id: StepId,
    },
    ReorderSteps {
        order: Vec<StepId>,
    },
    AddTask {
        id: TaskId,
        step: StepId,
        name: String,
        #[serde(default)]
        done: bool,
    },
    UpdateTask {
        id: TaskId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        done: Option<bool>,
    },
    RemoveTask {
        id: TaskId,
    },
    ReorderTasks {
        order: Vec<TaskId>,
    },
    AddPrerequisite {
        id: PrerequisiteId,
        step: StepId,
        description: String,
    },
    RemovePrerequisite {
        id: PrerequisiteId,
    },
}

/// Private-scope actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkplanViewAction {
    SelectStep { step: StepId },
    ClearStepSelection,
}

/// Domain errors for workplan documents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkplanError {
    #[error("step not found: {id}")]
    StepNotFound { id: StepId },
    #[error("duplicate step: {id}")]
    DuplicateStep { id: StepId },
    #[error("task not found: {id}")]
    TaskNotFound { id: TaskId },
    #[error("duplicate task: {id}")]
    DuplicateTask { id: TaskId },
    #[error("prerequisite not found: {id}")]
    PrerequisiteNotFound { id: PrerequisiteId },
    #[error("duplicate prerequisite: {id}")]
    DuplicatePrerequisite { id: PrerequisiteId },
    #[error("reorder list does not match current ids (have {expected}, got {actual})")]
    PermutationMismatch { expected: usize, actual: usize },
}

impl DomainError for WorkplanError {
    fn code(&self) -> &'static str {
        match self {
            WorkplanError::StepNotFound { .. } => "STEP_NOT_FOUND",
            WorkplanError::DuplicateStep { .. } => "DUPLICATE_STEP",
            WorkplanError::TaskNotFound { .. } => "TASK_NOT_FOUND",
            WorkplanError::DuplicateTask { .. } => "DUPLICATE_TASK",
            WorkplanError::PrerequisiteNotFound { .. } => "PREREQUISITE_NOT_FOUND",
            WorkplanError::DuplicatePrerequisite { .. } => "DUPLICATE_PREREQUISITE",
            WorkplanError::PermutationMismatch { .. } => "PERMUTATION_MISMATCH",
        }
    }
}

/// Workplan document model.
pub struct WorkplanModel;

impl DocumentModel for WorkplanModel {
    type Shared = WorkplanShared;
    type Private = WorkplanView;
    type SharedAction = WorkplanAction;
    type PrivateAction = WorkplanViewAction;
    type Error = WorkplanError;

    const KIND: DocKind = DocKind::Workplan;

    fn shared_action_types() -> &'static [&'static str] {
        &[
            "ADD_STEP",
            "UPDATE_STEP",
            "REMOVE_STEP",
            "REORDER_STEPS",
            "ADD_TASK",
            "UPDATE_TASK",
            "REMOVE_TASK",
            "REORDER_TASKS",
            "ADD_PREREQUISITE",
            "REMOVE_PREREQUISITE",
        ]
    }

    fn private_action_types() -> &'static [&'static str] {
        &["SELECT_STEP", "CLEAR_STEP_SELECTION"]
    }

    fn apply_shared(
        state: &mut Self::Shared,
        action: &Self::SharedAction,
    ) -> Result<(), Self::Error> {
        match action {
            WorkplanAction::AddStep {
                id,
                name,
                description,
            } => state
                .steps
                .insert(Step {
                    id: id.clone(),
                    name: name.clone(),
                    description: description.clone(),
                })
                .map_err(|dup| WorkplanError::DuplicateStep { id: dup.id }),
            WorkplanAction::UpdateStep {
                id,
                name,
                description,
            } => {
                let step = state
                    .steps
                    .get_mut(id)
                    .ok_or_else(|| WorkplanError::StepNotFound { id: id.clone() })?;
                if let Some(name) = name {
                    step.name = name.clone();
                }
                description.apply_to(&mut step.description);
                Ok(())
            }
            WorkplanAction::RemoveStep { id } => {
                state
                    .steps
                    .remove(id)
                    .ok_or_else(|| WorkplanError::StepNotFound { id: id.clone() })?;
                // Dependents go with the step.
                state.tasks.retain(|task| &task.step != id);
                state.prerequisites.retain(|prereq| &prereq.step != id);
                Ok(())
            }
            WorkplanAction::ReorderSteps { order } => {
                if !state.steps.reorder(order) {
                    return Err(WorkplanError::PermutationMismatch {
                        expected: state.steps.len(),
                        actual: order.len(),
                    });
                }
                Ok(())
            }
            WorkplanAction::AddTask {
                id,
                step,
                name,
                done,
            } => {
                if !state.steps.contains(step) {
                    return Err(WorkplanError::StepNotFound { id: step.clone() });
                }
                state
                    .tasks
                    .insert(Task {
                        id: id.clone(),
                        step: step.clone(),
                        name: name.clone(),
                        done: *done,
                    })
                    .map_err(|dup| WorkplanError::DuplicateTask { id: dup.id })
            }
            WorkplanAction::UpdateTask { id, name, done } => {
                let task = state
                    .tasks
                    .get_mut(id)
                    .ok_or_else(|| WorkplanError::TaskNotFound { id: id.clone() })?;
                if let Some(name) = name {
                    task.name = name.clone();
                }
                if let Some(done) = done {
                    task.done = *done;
                }
                Ok(())
            }
            WorkplanAction::RemoveTask { id } => {
                state
                    .tasks
                    .remove(id)
                    .ok_or_else(|| WorkplanError::TaskNotFound { id: id.clone() })?;
                Ok(())
            }
            WorkplanAction::ReorderTasks { order } => {
                if !state.tasks.reorder(order) {
                    return Err(WorkplanError::PermutationMismatch {
                        expected: state.tasks.len(),
                        actual: order.len(),
                    });
                }
                Ok(())
            }
            WorkplanAction::AddPrerequisite {
                id,
                step,
                description,
            } => {
                if !state.steps.contains(step) {
                    return Err(WorkplanError::StepNotFound { id: step.clone() });
                }
                state
                    .prerequisites
                    .insert(Prerequisite {
                        id: id.clone(),
                        step: step.clone(),
                        description: description.clone(),
                    })
                    .map_err(|dup| WorkplanError::DuplicatePrerequisite { id: dup.id })
            }
            WorkplanAction::RemovePrerequisite { id } => {
                state
                    .prerequisites
                    .remove(id)
                    .ok_or_else(|| WorkplanError::PrerequisiteNotFound { id: id.clone() })?;
                Ok(())
            }
        }
    }

    fn apply_private(
        state: &mut Self::Private,
        action: &Self::PrivateAction,
    ) -> Result<(), Self::Error> {
        match action {
            WorkplanViewAction::SelectStep { step } => {
                state.selected_step = Some(step.clone());
                Ok(())
            }
            WorkplanViewAction::ClearStepSelection => {
                state.selected_step = None;
                Ok(())
            }
        }
    }
}
