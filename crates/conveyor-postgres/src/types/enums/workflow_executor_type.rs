//! Workflow executor type enumeration.

use diesel_derive_enum::DbEnum;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Defines what executes a workflow runner.
///
/// This enumeration corresponds to the `WORKFLOW_EXECUTOR_TYPE` PostgreSQL enum.
/// Hook stages run as Argo workflows; deploy stages are driven by the engine
/// itself through a release driver.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[derive(Serialize, Deserialize, DbEnum, Display, EnumIter, EnumString)]
#[ExistingTypePath = "crate::schema::sql_types::WorkflowExecutorType"]
pub enum WorkflowExecutorType {
    /// Executed as an Argo workflow (pre/post hook stages).
    #[db_rename = "argo_workflow"]
    #[serde(rename = "argo_workflow")]
    ArgoWorkflow,

    /// Executed by the engine itself (deploy stage).
    #[db_rename = "system"]
    #[serde(rename = "system")]
    #[default]
    System,
}

impl WorkflowExecutorType {
    /// Returns whether the runner executes as an Argo workflow.
    #[inline]
    pub fn is_argo_workflow(self) -> bool {
        matches!(self, WorkflowExecutorType::ArgoWorkflow)
    }

    /// Returns whether the runner is executed by the engine.
    #[inline]
    pub fn is_system(self) -> bool {
        matches!(self, WorkflowExecutorType::System)
    }
}
