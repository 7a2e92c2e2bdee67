//! Pipeline status sync details repository for poll bookkeeping.

use std::future::Future;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::model::{NewPipelineStatusSyncDetail, PipelineStatusSyncDetail};
use crate::{PgConnection, PgError, PgResult, schema};

/// Repository for pipeline status sync detail database operations.
pub trait PipelineStatusSyncDetailRepository {
    /// Records a status poll for the runner.
    ///
    /// Creates the bookkeeping row on first poll, afterwards bumps the
    /// poll counter and refreshes the last poll time.
    fn record_runner_sync(
        &mut self,
        runner_id: i64,
    ) -> impl Future<Output = PgResult<PipelineStatusSyncDetail>> + Send;

    /// Gets the poll bookkeeping row of a runner.
    fn find_sync_detail_by_runner(
        &mut self,
        runner_id: i64,
    ) -> impl Future<Output = PgResult<Option<PipelineStatusSyncDetail>>> + Send;
}

impl PipelineStatusSyncDetailRepository for PgConnection {
    async fn record_runner_sync(&mut self, runner_id: i64) -> PgResult<PipelineStatusSyncDetail> {
        use diesel::dsl::now;
        use schema::pipeline_status_sync_detail::{self, dsl};

        let new_sync_detail = NewPipelineStatusSyncDetail {
            cd_workflow_runner_id: Some(runner_id),
            installed_app_version_history_id: None,
            last_synced_at: jiff::Timestamp::now().into(),
            sync_count: Some(1),
        };

        let sync_detail = diesel::insert_into(pipeline_status_sync_detail::table)
            .values(&new_sync_detail)
            .on_conflict(dsl::cd_workflow_runner_id)
            .do_update()
            .set((
                dsl::last_synced_at.eq(now),
                dsl::sync_count.eq(dsl::sync_count + 1),
                dsl::updated_on.eq(now),
            ))
            .returning(PipelineStatusSyncDetail::as_returning())
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        Ok(sync_detail)
    }

    async fn find_sync_detail_by_runner(
        &mut self,
        runner_id: i64,
    ) -> PgResult<Option<PipelineStatusSyncDetail>> {
        use schema::pipeline_status_sync_detail::{self, dsl};

        let sync_detail = pipeline_status_sync_detail::table
            .filter(dsl::cd_workflow_runner_id.eq(runner_id))
            .select(PipelineStatusSyncDetail::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(sync_detail)
    }
}
