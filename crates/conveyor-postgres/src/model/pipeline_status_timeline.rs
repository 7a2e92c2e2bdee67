//! Pipeline status timeline model for PostgreSQL database operations.

use diesel::prelude::*;
use jiff_diesel::Timestamp;

use crate::schema::pipeline_status_timeline;
use crate::types::TimelineStatus;

/// One milestone in the deployment progress trail of a runner.
///
/// Rows belong either to a CD workflow runner or to an app-store install
/// history record, never both.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = pipeline_status_timeline)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PipelineStatusTimeline {
    /// Unique timeline entry identifier.
    pub id: i64,
    /// Owning CD workflow runner, if platform-deployed.
    pub cd_workflow_runner_id: Option<i64>,
    /// Owning install history record, if app-store-deployed.
    pub installed_app_version_history_id: Option<i64>,
    /// The milestone reached.
    pub status: TimelineStatus,
    /// Human-readable detail for the milestone.
    pub status_detail: String,
    /// When the milestone was observed.
    pub status_time: Timestamp,
    /// When the entry was created.
    pub created_on: Timestamp,
    /// When the entry was last updated.
    pub updated_on: Timestamp,
}

/// Data for creating a new timeline entry.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = pipeline_status_timeline)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewPipelineStatusTimeline {
    /// Owning CD workflow runner.
    pub cd_workflow_runner_id: Option<i64>,
    /// Owning install history record.
    pub installed_app_version_history_id: Option<i64>,
    /// Milestone (required).
    pub status: TimelineStatus,
    /// Milestone detail (required).
    pub status_detail: String,
    /// Observation time (required).
    pub status_time: Timestamp,
}

/// Data for updating a timeline entry in place.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = pipeline_status_timeline)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UpdatePipelineStatusTimeline {
    /// Milestone.
    pub status: Option<TimelineStatus>,
    /// Milestone detail.
    pub status_detail: Option<String>,
    /// Observation time.
    pub status_time: Option<Timestamp>,
}

impl NewPipelineStatusTimeline {
    /// Creates a timeline entry for a runner with the standard detail text
    /// and the current time.
    pub fn for_runner(cd_workflow_runner_id: i64, status: TimelineStatus) -> Self {
        Self {
            cd_workflow_runner_id: Some(cd_workflow_runner_id),
            installed_app_version_history_id: None,
            status,
            status_detail: status.default_detail().to_owned(),
            status_time: jiff::Timestamp::now().into(),
        }
    }

    /// Replaces the standard detail text with a caller-supplied one.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.status_detail = detail.into();
        self
    }
}

impl PipelineStatusTimeline {
    /// Returns whether this milestone ends the trail.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns whether this milestone overwrites in place on repeat.
    pub fn is_redundant_marker(&self) -> bool {
        self.status.is_redundant_marker()
    }
}
