//! Pipeline status timelines repository for the deployment progress trail.

use std::collections::HashSet;
use std::future::Future;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::model::{NewPipelineStatusTimeline, PipelineStatusTimeline};
use crate::types::{OffsetPagination, TimelineStatus};
use crate::{PgConnection, PgError, PgResult, schema};

/// Repository for pipeline status timeline database operations.
///
/// Timelines are append-only with two exceptions: the transient
/// fetch-problem markers overwrite their single existing row, and nothing
/// is appended after a terminal milestone.
pub trait PipelineStatusTimelineRepository {
    /// Saves a timeline entry.
    ///
    /// For the fetch-problem markers the existing marker row of the runner
    /// is overwritten in place, keeping its id, so repeated failed polls do
    /// not grow the trail. Everything else is a plain insert.
    fn save_timeline(
        &mut self,
        new_timeline: NewPipelineStatusTimeline,
    ) -> impl Future<Output = PgResult<PipelineStatusTimeline>> + Send;

    /// Inserts several timeline entries at once.
    fn save_timelines(
        &mut self,
        new_timelines: Vec<NewPipelineStatusTimeline>,
    ) -> impl Future<Output = PgResult<Vec<PipelineStatusTimeline>>> + Send;

    /// Saves a timeline entry unless the runner already has one with the
    /// same status or has already reached a terminal milestone.
    ///
    /// Returns whether a row was written, along with the stored entry:
    /// the freshly inserted one, the pre-existing one with the same
    /// status, or `None` when a terminal milestone blocked the write.
    fn save_timeline_if_not_already_present(
        &mut self,
        new_timeline: NewPipelineStatusTimeline,
    ) -> impl Future<Output = PgResult<(bool, Option<PipelineStatusTimeline>)>> + Send;

    /// Lists the full trail of a runner in observation order.
    fn list_timelines_by_runner(
        &mut self,
        runner_id: i64,
    ) -> impl Future<Output = PgResult<Vec<PipelineStatusTimeline>>> + Send;

    /// Gets the most recent milestone of a runner.
    fn find_latest_timeline(
        &mut self,
        runner_id: i64,
    ) -> impl Future<Output = PgResult<Option<PipelineStatusTimeline>>> + Send;

    /// Returns whether the runner has a milestone with the given status.
    fn timeline_status_exists(
        &mut self,
        runner_id: i64,
        status: TimelineStatus,
    ) -> impl Future<Output = PgResult<bool>> + Send;

    /// Returns whether the runner has reached any terminal milestone.
    fn terminal_timeline_exists(
        &mut self,
        runner_id: i64,
    ) -> impl Future<Output = PgResult<bool>> + Send;

    /// Records the failed milestone for a runner unless its trail already
    /// ended.
    fn mark_timeline_failed(
        &mut self,
        runner_id: i64,
        detail: &str,
    ) -> impl Future<Output = PgResult<()>> + Send;

    /// Records the superseded milestone for a runner unless its trail
    /// already ended.
    fn mark_timeline_superseded(
        &mut self,
        runner_id: i64,
    ) -> impl Future<Output = PgResult<()>> + Send;

    /// Finds runners whose manifests synced at least `stuck_for_seconds`
    /// ago without the application turning healthy or the trail ending.
    ///
    /// These are the deployments the degradation sweep re-checks.
    fn find_runner_ids_stuck_after_apply(
        &mut self,
        stuck_for_seconds: i64,
        pagination: OffsetPagination,
    ) -> impl Future<Output = PgResult<Vec<i64>>> + Send;
}

impl PipelineStatusTimelineRepository for PgConnection {
    async fn save_timeline(
        &mut self,
        new_timeline: NewPipelineStatusTimeline,
    ) -> PgResult<PipelineStatusTimeline> {
        use diesel::dsl::now;
        use schema::pipeline_status_timeline::{self, dsl};

        if new_timeline.status.is_redundant_marker() {
            if let Some(runner_id) = new_timeline.cd_workflow_runner_id {
                let existing: Vec<PipelineStatusTimeline> = pipeline_status_timeline::table
                    .filter(dsl::cd_workflow_runner_id.eq(runner_id))
                    .filter(dsl::status.eq_any(TimelineStatus::REDUNDANT_MARKERS.to_vec()))
                    .select(PipelineStatusTimeline::as_select())
                    .load(self)
                    .await
                    .map_err(PgError::from)?;

                if existing.len() > 1 {
                    return Err(PgError::Unexpected(
                        "multiple unable-to-fetch or fetch-timed-out timelines found for one workflow runner"
                            .into(),
                    ));
                }

                if let Some(current) = existing.into_iter().next() {
                    let updated = diesel::update(
                        pipeline_status_timeline::table.filter(dsl::id.eq(current.id)),
                    )
                    .set((
                        dsl::status.eq(new_timeline.status),
                        dsl::status_detail.eq(&new_timeline.status_detail),
                        dsl::status_time.eq(&new_timeline.status_time),
                        dsl::updated_on.eq(now),
                    ))
                    .returning(PipelineStatusTimeline::as_returning())
                    .get_result(self)
                    .await
                    .map_err(PgError::from)?;

                    return Ok(updated);
                }
            }
        }

        let timeline = diesel::insert_into(pipeline_status_timeline::table)
            .values(&new_timeline)
            .returning(PipelineStatusTimeline::as_returning())
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        Ok(timeline)
    }

    async fn save_timelines(
        &mut self,
        new_timelines: Vec<NewPipelineStatusTimeline>,
    ) -> PgResult<Vec<PipelineStatusTimeline>> {
        use schema::pipeline_status_timeline;

        if new_timelines.is_empty() {
            return Ok(Vec::new());
        }

        let timelines = diesel::insert_into(pipeline_status_timeline::table)
            .values(&new_timelines)
            .returning(PipelineStatusTimeline::as_returning())
            .get_results(self)
            .await
            .map_err(PgError::from)?;

        Ok(timelines)
    }

    async fn save_timeline_if_not_already_present(
        &mut self,
        new_timeline: NewPipelineStatusTimeline,
    ) -> PgResult<(bool, Option<PipelineStatusTimeline>)> {
        use schema::pipeline_status_timeline::{self, dsl};

        let Some(runner_id) = new_timeline.cd_workflow_runner_id else {
            let timeline = self.save_timeline(new_timeline).await?;
            return Ok((true, Some(timeline)));
        };

        if self.terminal_timeline_exists(runner_id).await? {
            return Ok((false, None));
        }

        let existing = pipeline_status_timeline::table
            .filter(dsl::cd_workflow_runner_id.eq(runner_id))
            .filter(dsl::status.eq(new_timeline.status))
            .order(dsl::id.desc())
            .select(PipelineStatusTimeline::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        if let Some(existing) = existing {
            return Ok((false, Some(existing)));
        }

        let timeline = self.save_timeline(new_timeline).await?;
        Ok((true, Some(timeline)))
    }

    async fn list_timelines_by_runner(
        &mut self,
        runner_id: i64,
    ) -> PgResult<Vec<PipelineStatusTimeline>> {
        use schema::pipeline_status_timeline::{self, dsl};

        let timelines = pipeline_status_timeline::table
            .filter(dsl::cd_workflow_runner_id.eq(runner_id))
            .order((dsl::status_time.asc(), dsl::id.asc()))
            .select(PipelineStatusTimeline::as_select())
            .load(self)
            .await
            .map_err(PgError::from)?;

        Ok(timelines)
    }

    async fn find_latest_timeline(
        &mut self,
        runner_id: i64,
    ) -> PgResult<Option<PipelineStatusTimeline>> {
        use schema::pipeline_status_timeline::{self, dsl};

        let timeline = pipeline_status_timeline::table
            .filter(dsl::cd_workflow_runner_id.eq(runner_id))
            .order((dsl::status_time.desc(), dsl::id.desc()))
            .select(PipelineStatusTimeline::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(timeline)
    }

    async fn timeline_status_exists(
        &mut self,
        runner_id: i64,
        status: TimelineStatus,
    ) -> PgResult<bool> {
        use diesel::dsl::exists;
        use schema::pipeline_status_timeline::{self, dsl};

        let found = diesel::select(exists(
            pipeline_status_timeline::table
                .filter(dsl::cd_workflow_runner_id.eq(runner_id))
                .filter(dsl::status.eq(status)),
        ))
        .get_result(self)
        .await
        .map_err(PgError::from)?;

        Ok(found)
    }

    async fn terminal_timeline_exists(&mut self, runner_id: i64) -> PgResult<bool> {
        use diesel::dsl::exists;
        use schema::pipeline_status_timeline::{self, dsl};

        let found = diesel::select(exists(
            pipeline_status_timeline::table
                .filter(dsl::cd_workflow_runner_id.eq(runner_id))
                .filter(dsl::status.eq_any(TimelineStatus::TERMINAL.to_vec())),
        ))
        .get_result(self)
        .await
        .map_err(PgError::from)?;

        Ok(found)
    }

    async fn mark_timeline_failed(&mut self, runner_id: i64, detail: &str) -> PgResult<()> {
        if self.terminal_timeline_exists(runner_id).await? {
            return Ok(());
        }

        let timeline =
            NewPipelineStatusTimeline::for_runner(runner_id, TimelineStatus::DeploymentFailed)
                .with_detail(detail);
        self.save_timeline(timeline).await?;

        Ok(())
    }

    async fn mark_timeline_superseded(&mut self, runner_id: i64) -> PgResult<()> {
        if self.terminal_timeline_exists(runner_id).await? {
            return Ok(());
        }

        let timeline =
            NewPipelineStatusTimeline::for_runner(runner_id, TimelineStatus::Superseded);
        self.save_timeline(timeline).await?;

        Ok(())
    }

    async fn find_runner_ids_stuck_after_apply(
        &mut self,
        stuck_for_seconds: i64,
        pagination: OffsetPagination,
    ) -> PgResult<Vec<i64>> {
        use schema::pipeline_status_timeline::{self, dsl};

        let threshold: jiff_diesel::Timestamp = jiff::Timestamp::now()
            .saturating_sub(jiff::SignedDuration::from_secs(stuck_for_seconds))
            .expect("saturating arithmetic with SignedDuration cannot fail")
            .into();

        let candidates: Vec<Option<i64>> = pipeline_status_timeline::table
            .filter(dsl::status.eq(TimelineStatus::KubectlApplySynced))
            .filter(dsl::status_time.le(&threshold))
            .filter(dsl::cd_workflow_runner_id.is_not_null())
            .select(dsl::cd_workflow_runner_id)
            .distinct()
            .order(dsl::cd_workflow_runner_id.asc())
            .limit(pagination.limit)
            .offset(pagination.offset)
            .load(self)
            .await
            .map_err(PgError::from)?;

        let candidates: Vec<i64> = candidates.into_iter().flatten().collect();
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let mut settled_statuses = TimelineStatus::TERMINAL.to_vec();
        settled_statuses.push(TimelineStatus::AppHealthy);

        let settled: Vec<Option<i64>> = pipeline_status_timeline::table
            .filter(dsl::cd_workflow_runner_id.eq_any(candidates.clone()))
            .filter(dsl::status.eq_any(settled_statuses))
            .select(dsl::cd_workflow_runner_id)
            .distinct()
            .load(self)
            .await
            .map_err(PgError::from)?;

        let settled: HashSet<i64> = settled.into_iter().flatten().collect();
        let stuck = candidates
            .into_iter()
            .filter(|id| !settled.contains(id))
            .collect();

        Ok(stuck)
    }
}
