//! Workflow-level status enumeration for the trigger request lifecycle.

use diesel_derive_enum::DbEnum;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Defines the coarse lifecycle of a deployment workflow request.
///
/// This enumeration corresponds to the `CD_WORKFLOW_STATUS` PostgreSQL enum.
/// It tracks the request envelope around a workflow, while the per-stage
/// [`WorkflowRunnerStatus`](super::WorkflowRunnerStatus) tracks execution.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[derive(Serialize, Deserialize, DbEnum, Display, EnumIter, EnumString)]
#[ExistingTypePath = "crate::schema::sql_types::CdWorkflowStatus"]
pub enum CdWorkflowStatus {
    /// Workflow created without a recorded request outcome.
    #[db_rename = "unknown"]
    #[serde(rename = "unknown")]
    #[default]
    Unknown,

    /// Trigger request validated and accepted.
    #[db_rename = "request_accepted"]
    #[serde(rename = "request_accepted")]
    RequestAccepted,

    /// Deploy request published to the message bus.
    #[db_rename = "enqueued"]
    #[serde(rename = "enqueued")]
    Enqueued,

    /// A consumer picked up the request and began executing it.
    #[db_rename = "started"]
    #[serde(rename = "started")]
    Started,

    /// Request dropped because a newer deployment superseded it.
    #[db_rename = "dropped_stale"]
    #[serde(rename = "dropped_stale")]
    DroppedStale,

    /// Trigger failed before any stage could run.
    #[db_rename = "trigger_error"]
    #[serde(rename = "trigger_error")]
    TriggerError,
}

impl CdWorkflowStatus {
    /// Returns whether the workflow request was dropped as stale.
    #[inline]
    pub fn is_dropped_stale(self) -> bool {
        matches!(self, CdWorkflowStatus::DroppedStale)
    }

    /// Returns whether the trigger failed before execution.
    #[inline]
    pub fn is_trigger_error(self) -> bool {
        matches!(self, CdWorkflowStatus::TriggerError)
    }
}
