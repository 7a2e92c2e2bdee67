//! Workflow type enumeration naming the stage a runner executes.

use diesel_derive_enum::DbEnum;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Defines the stage of a deployment workflow.
///
/// This enumeration corresponds to the `WORKFLOW_TYPE` PostgreSQL enum. Every
/// runner executes exactly one stage; a full deployment is pre (optional),
/// deploy, then post (optional).
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[derive(Serialize, Deserialize, DbEnum, Display, EnumIter, EnumString)]
#[ExistingTypePath = "crate::schema::sql_types::WorkflowType"]
pub enum WorkflowType {
    /// Pre-deploy hook stage.
    #[db_rename = "pre"]
    #[serde(rename = "pre")]
    #[strum(serialize = "pre")]
    Pre,

    /// The deployment itself.
    #[db_rename = "deploy"]
    #[serde(rename = "deploy")]
    #[strum(serialize = "deploy")]
    #[default]
    Deploy,

    /// Post-deploy hook stage.
    #[db_rename = "post"]
    #[serde(rename = "post")]
    #[strum(serialize = "post")]
    Post,
}

impl WorkflowType {
    /// Returns whether this is the pre-deploy stage.
    #[inline]
    pub fn is_pre(self) -> bool {
        matches!(self, WorkflowType::Pre)
    }

    /// Returns whether this is the deploy stage.
    #[inline]
    pub fn is_deploy(self) -> bool {
        matches!(self, WorkflowType::Deploy)
    }

    /// Returns whether this is the post-deploy stage.
    #[inline]
    pub fn is_post(self) -> bool {
        matches!(self, WorkflowType::Post)
    }

    /// Returns whether this stage runs a hook workflow rather than a deployment.
    #[inline]
    pub fn is_hook_stage(self) -> bool {
        matches!(self, WorkflowType::Pre | WorkflowType::Post)
    }
}
