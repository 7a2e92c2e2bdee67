//! Latest CI workflow index model for PostgreSQL database operations.

use diesel::prelude::*;
use jiff_diesel::Timestamp;

use crate::schema::ci_workflow_status_latest;

/// Index row pointing at the most recent CI workflow of a pipeline.
///
/// Maintained alongside workflow writes so dashboards and the propagator
/// can resolve the newest build without scanning workflow history.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = ci_workflow_status_latest)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CiWorkflowStatusLatest {
    /// Unique index row identifier.
    pub id: i64,
    /// CI pipeline this row indexes.
    pub pipeline_id: i64,
    /// Application the pipeline builds.
    pub app_id: i64,
    /// Most recent CI workflow of the pipeline.
    pub ci_workflow_id: i64,
    /// When the row was created.
    pub created_on: Timestamp,
    /// When the row was last updated.
    pub updated_on: Timestamp,
}

/// Data for creating a new latest-CI index row.
#[derive(Debug, Default, Clone, Insertable)]
#[diesel(table_name = ci_workflow_status_latest)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewCiWorkflowStatusLatest {
    /// CI pipeline (required).
    pub pipeline_id: i64,
    /// Application (required).
    pub app_id: i64,
    /// Most recent CI workflow (required).
    pub ci_workflow_id: i64,
}
