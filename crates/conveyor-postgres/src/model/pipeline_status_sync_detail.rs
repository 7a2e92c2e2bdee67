//! Pipeline status sync detail model for PostgreSQL database operations.

use diesel::prelude::*;
use jiff_diesel::Timestamp;

use crate::schema::pipeline_status_sync_detail;

/// Bookkeeping record for status polls against a single deployment.
///
/// One row exists per runner. Every poll bumps `sync_count` and refreshes
/// `last_synced_at`, which lets the reconciler skip deployments it checked
/// moments ago.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = pipeline_status_sync_detail)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PipelineStatusSyncDetail {
    /// Unique sync detail identifier.
    pub id: i64,
    /// Owning CD workflow runner, if platform-deployed.
    pub cd_workflow_runner_id: Option<i64>,
    /// Owning install history record, if app-store-deployed.
    pub installed_app_version_history_id: Option<i64>,
    /// When the deployment status was last polled.
    pub last_synced_at: Timestamp,
    /// How many times the status has been polled.
    pub sync_count: i32,
    /// When the record was created.
    pub created_on: Timestamp,
    /// When the record was last updated.
    pub updated_on: Timestamp,
}

/// Data for creating a new sync detail record.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = pipeline_status_sync_detail)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewPipelineStatusSyncDetail {
    /// Owning CD workflow runner.
    pub cd_workflow_runner_id: Option<i64>,
    /// Owning install history record.
    pub installed_app_version_history_id: Option<i64>,
    /// First poll time (required).
    pub last_synced_at: Timestamp,
    /// Initial poll count.
    pub sync_count: Option<i32>,
}

impl PipelineStatusSyncDetail {
    /// Returns whether the deployment was polled within the last
    /// `seconds` seconds.
    pub fn synced_within(&self, seconds: i64) -> bool {
        let last: jiff::Timestamp = self.last_synced_at.into();
        let elapsed = jiff::Timestamp::now().duration_since(last);
        elapsed.as_secs() >= 0 && elapsed.as_secs() < seconds
    }
}
