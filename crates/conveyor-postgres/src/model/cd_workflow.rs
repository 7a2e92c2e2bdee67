//! CD workflow model for PostgreSQL database operations.

use diesel::prelude::*;
use jiff_diesel::Timestamp;

use crate::schema::cd_workflow;
use crate::types::CdWorkflowStatus;

/// CD workflow model binding an artifact to a pipeline deployment attempt.
///
/// The workflow is the request envelope. Execution happens in per-stage
/// workflow runners that reference it.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = cd_workflow)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CdWorkflow {
    /// Unique workflow identifier.
    pub id: i64,
    /// Pipeline being deployed.
    pub pipeline_id: i64,
    /// Artifact being deployed.
    pub ci_artifact_id: i64,
    /// Coarse request lifecycle status.
    pub workflow_status: CdWorkflowStatus,
    /// When the workflow was created.
    pub created_on: Timestamp,
    /// When the workflow was last updated.
    pub updated_on: Timestamp,
}

/// Data for creating a new CD workflow.
#[derive(Debug, Default, Clone, Insertable)]
#[diesel(table_name = cd_workflow)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewCdWorkflow {
    /// Pipeline ID (required).
    pub pipeline_id: i64,
    /// Artifact ID (required).
    pub ci_artifact_id: i64,
    /// Initial request status.
    pub workflow_status: Option<CdWorkflowStatus>,
}

/// Data for updating a CD workflow.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = cd_workflow)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UpdateCdWorkflow {
    /// Request lifecycle status.
    pub workflow_status: Option<CdWorkflowStatus>,
}

impl CdWorkflow {
    /// Returns whether the request was dropped as stale.
    pub fn is_dropped_stale(&self) -> bool {
        self.workflow_status.is_dropped_stale()
    }

    /// Returns whether the trigger failed before execution.
    pub fn is_trigger_error(&self) -> bool {
        self.workflow_status.is_trigger_error()
    }
}
