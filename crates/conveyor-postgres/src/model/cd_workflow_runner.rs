//! CD workflow runner model for PostgreSQL database operations.

use diesel::prelude::*;
use jiff_diesel::Timestamp;

use crate::schema::cd_workflow_runner;
use crate::types::{WorkflowExecutorType, WorkflowRunnerStatus, WorkflowType};

/// Execution record for a single stage of a CD workflow.
///
/// Each workflow spawns at most one active runner per stage. Retried stages
/// get fresh runner rows that point back at the original attempt through
/// `ref_cd_workflow_runner_id`, keeping the retry budget countable.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = cd_workflow_runner)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CdWorkflowRunner {
    /// Unique runner identifier.
    pub id: i64,
    /// Workflow this runner executes a stage of.
    pub cd_workflow_id: i64,
    /// Which stage this runner executes.
    pub workflow_type: WorkflowType,
    /// Execution backend for this stage.
    pub executor_type: WorkflowExecutorType,
    /// Current execution status.
    pub status: WorkflowRunnerStatus,
    /// Failure or progress detail, if any.
    pub message: Option<String>,
    /// When execution started.
    pub started_on: Timestamp,
    /// When execution reached a terminal status.
    pub finished_on: Option<Timestamp>,
    /// User that triggered this stage.
    pub triggered_by: i64,
    /// Original attempt this runner retries, if any.
    pub ref_cd_workflow_runner_id: Option<i64>,
    /// Image path reservations held by this runner.
    pub image_path_reservation_ids: Vec<i64>,
    /// External reference correlating bus messages to this runner.
    pub reference_id: Option<String>,
    /// Namespace the stage executes in.
    pub namespace: Option<String>,
    /// Location of collected execution logs.
    pub log_location: Option<String>,
    /// When the runner was created.
    pub created_on: Timestamp,
    /// When the runner was last updated.
    pub updated_on: Timestamp,
}

/// Data for creating a new CD workflow runner.
#[derive(Debug, Default, Clone, Insertable)]
#[diesel(table_name = cd_workflow_runner)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewCdWorkflowRunner {
    /// Workflow ID (required).
    pub cd_workflow_id: i64,
    /// Stage (required).
    pub workflow_type: WorkflowType,
    /// Execution backend (required).
    pub executor_type: WorkflowExecutorType,
    /// Initial status.
    pub status: Option<WorkflowRunnerStatus>,
    /// Progress detail.
    pub message: Option<String>,
    /// Execution start time.
    pub started_on: Option<Timestamp>,
    /// Triggering user (required).
    pub triggered_by: i64,
    /// Original attempt this runner retries.
    pub ref_cd_workflow_runner_id: Option<i64>,
    /// Image path reservations.
    pub image_path_reservation_ids: Option<Vec<i64>>,
    /// External message reference.
    pub reference_id: Option<String>,
    /// Execution namespace.
    pub namespace: Option<String>,
}

/// Data for updating a CD workflow runner.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = cd_workflow_runner)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UpdateCdWorkflowRunner {
    /// Execution status.
    pub status: Option<WorkflowRunnerStatus>,
    /// Failure or progress detail.
    pub message: Option<Option<String>>,
    /// Terminal completion time.
    pub finished_on: Option<Option<Timestamp>>,
    /// Execution namespace.
    pub namespace: Option<Option<String>>,
    /// Log location.
    pub log_location: Option<Option<String>>,
}

impl CdWorkflowRunner {
    /// Returns whether the runner has reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns whether the runner is still progressing.
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Returns whether the runner is waiting to start.
    pub fn is_queued(&self) -> bool {
        self.status.is_queued()
    }

    /// Returns whether the stage completed successfully.
    pub fn is_succeeded(&self) -> bool {
        self.status.is_succeeded()
    }

    /// Returns whether the stage failed.
    pub fn is_failed(&self) -> bool {
        self.status.is_failed()
    }

    /// Returns whether this runner executes the deploy stage.
    pub fn is_deploy_stage(&self) -> bool {
        self.workflow_type.is_deploy()
    }

    /// Returns whether this runner executes a pre or post hook stage.
    pub fn is_hook_stage(&self) -> bool {
        self.workflow_type.is_hook_stage()
    }

    /// Returns whether this runner is a retry of an earlier attempt.
    pub fn is_retry(&self) -> bool {
        self.ref_cd_workflow_runner_id.is_some()
    }

    /// Returns the original attempt all retries count against: the
    /// referenced runner for retries, otherwise this runner itself.
    pub fn retry_root_id(&self) -> i64 {
        self.ref_cd_workflow_runner_id.unwrap_or(self.id)
    }

    /// Returns the duration of the stage in seconds, if it finished.
    pub fn duration_seconds(&self) -> Option<f64> {
        let finished = self.finished_on?;
        let started_ts: jiff::Timestamp = self.started_on.into();
        let finished_ts: jiff::Timestamp = finished.into();
        Some(finished_ts.duration_since(started_ts).as_secs_f64())
    }
}
