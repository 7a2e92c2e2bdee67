//! Latest CD workflow runner index model for PostgreSQL database operations.

use diesel::prelude::*;
use jiff_diesel::Timestamp;

use crate::schema::cd_workflow_status_latest;
use crate::types::WorkflowType;

/// Index row pointing at the most recent runner of a pipeline stage.
///
/// One row exists per `(pipeline_id, workflow_type)`. It always references
/// the runner with the highest id for that pair, which is what the
/// reconciler polls and what supersession checks compare against.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = cd_workflow_status_latest)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CdWorkflowStatusLatest {
    /// Unique index row identifier.
    pub id: i64,
    /// Pipeline this row indexes.
    pub pipeline_id: i64,
    /// Application the pipeline deploys.
    pub app_id: i64,
    /// Target environment of the pipeline.
    pub environment_id: i64,
    /// Stage this row indexes.
    pub workflow_type: WorkflowType,
    /// Most recent runner for the stage.
    pub cd_workflow_runner_id: i64,
    /// When the row was created.
    pub created_on: Timestamp,
    /// When the row was last updated.
    pub updated_on: Timestamp,
}

/// Data for creating a new latest-runner index row.
#[derive(Debug, Default, Clone, Insertable)]
#[diesel(table_name = cd_workflow_status_latest)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewCdWorkflowStatusLatest {
    /// Pipeline (required).
    pub pipeline_id: i64,
    /// Application (required).
    pub app_id: i64,
    /// Target environment (required).
    pub environment_id: i64,
    /// Stage (required).
    pub workflow_type: WorkflowType,
    /// Most recent runner (required).
    pub cd_workflow_runner_id: i64,
}
