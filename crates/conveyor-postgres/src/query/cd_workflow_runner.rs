//! CD workflow runners repository for managing stage execution records.

use std::future::Future;

use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use crate::model::{
    CdWorkflowRunner, NewCdWorkflowRunner, NewCdWorkflowStatusLatest, NewPipelineStatusTimeline,
    Pipeline, UpdateCdWorkflowRunner,
};
use crate::query::PipelineStatusTimelineRepository;
use crate::types::{OffsetPagination, TimelineStatus, WorkflowRunnerStatus, WorkflowType};
use crate::{PgConnection, PgError, PgResult, TRACING_TARGET_QUERY, schema};

/// Repository for CD workflow runner database operations.
///
/// Handles the stage execution lifecycle: creation, terminal-safe status
/// updates, supersession of overtaken attempts, and the scans that feed the
/// status reconciler.
pub trait CdWorkflowRunnerRepository {
    /// Creates a new runner record.
    fn create_cd_workflow_runner(
        &mut self,
        new_runner: NewCdWorkflowRunner,
    ) -> impl Future<Output = PgResult<CdWorkflowRunner>> + Send;

    /// Creates a runner and points the latest-runner index at it, in one
    /// transaction.
    ///
    /// Every runner insert goes through here so the index row for
    /// `(pipeline, stage)` can never lag behind the runner table.
    fn save_runner_with_latest(
        &mut self,
        new_runner: NewCdWorkflowRunner,
        pipeline_id: i64,
        app_id: i64,
        environment_id: i64,
    ) -> impl Future<Output = PgResult<CdWorkflowRunner>> + Send;

    /// Finds a runner by its unique identifier.
    fn find_cd_workflow_runner_by_id(
        &mut self,
        runner_id: i64,
    ) -> impl Future<Output = PgResult<Option<CdWorkflowRunner>>> + Send;

    /// Finds the newest runner for a pipeline stage by scanning runner
    /// history.
    fn find_latest_runner(
        &mut self,
        pipeline_id: i64,
        workflow_type: WorkflowType,
    ) -> impl Future<Output = PgResult<Option<CdWorkflowRunner>>> + Send;

    /// Finds the newest runner for a pipeline stage, preferring the
    /// latest-runner index and falling back to a history scan when the
    /// index has no row yet.
    fn find_current_runner(
        &mut self,
        pipeline_id: i64,
        workflow_type: WorkflowType,
    ) -> impl Future<Output = PgResult<Option<CdWorkflowRunner>>> + Send;

    /// Returns whether no newer runner exists for the same pipeline stage.
    fn is_latest_runner(
        &mut self,
        runner_id: i64,
        pipeline_id: i64,
        workflow_type: WorkflowType,
    ) -> impl Future<Output = PgResult<bool>> + Send;

    /// Finds the single non-terminal runner of a workflow stage, if one
    /// exists.
    fn find_active_runner(
        &mut self,
        cd_workflow_id: i64,
        workflow_type: WorkflowType,
    ) -> impl Future<Output = PgResult<Option<CdWorkflowRunner>>> + Send;

    /// Lists all runners of a workflow, newest first.
    fn find_runners_by_workflow(
        &mut self,
        cd_workflow_id: i64,
    ) -> impl Future<Output = PgResult<Vec<CdWorkflowRunner>>> + Send;

    /// Updates a runner with new data.
    fn update_cd_workflow_runner(
        &mut self,
        runner_id: i64,
        updates: UpdateCdWorkflowRunner,
    ) -> impl Future<Output = PgResult<CdWorkflowRunner>> + Send;

    /// Moves a runner to `status`, refusing to touch rows that already
    /// reached a terminal status.
    ///
    /// Terminal targets also set `finished_on`. Attempting to move a
    /// terminal runner fails with [`PgError::TerminalTransition`] so the
    /// caller can tell a lost race from a real fault.
    fn update_runner_status(
        &mut self,
        runner_id: i64,
        status: WorkflowRunnerStatus,
        message: Option<String>,
    ) -> impl Future<Output = PgResult<CdWorkflowRunner>> + Send;

    /// Moves a runner to a non-terminal `status`, quietly skipping runners
    /// that already finished.
    ///
    /// Returns `None` when the runner is terminal. Passing a terminal
    /// target status is a programming error and fails loudly.
    fn update_nonterminal_status(
        &mut self,
        runner_id: i64,
        status: WorkflowRunnerStatus,
    ) -> impl Future<Output = PgResult<Option<CdWorkflowRunner>>> + Send;

    /// Lists non-terminal deploy-stage runners of a pipeline older than
    /// `before_runner_id`, newest first.
    ///
    /// These are the attempts a newer deployment overtakes.
    fn find_previous_active_deploy_runners(
        &mut self,
        pipeline_id: i64,
        before_runner_id: i64,
    ) -> impl Future<Output = PgResult<Vec<CdWorkflowRunner>>> + Send;

    /// Fails every non-terminal runner in `runner_ids` with the given
    /// message, setting `finished_on`. Returns how many rows changed.
    fn fail_runners_by_ids(
        &mut self,
        runner_ids: Vec<i64>,
        message: &str,
    ) -> impl Future<Output = PgResult<usize>> + Send;

    /// Fails every non-terminal deploy-stage runner of the pipeline older
    /// than `before_runner_id` and stamps a superseded timeline on each,
    /// in one transaction.
    ///
    /// Returns the ids of the runners that were overtaken.
    fn supersede_previous_runners(
        &mut self,
        pipeline_id: i64,
        before_runner_id: i64,
        message: &str,
    ) -> impl Future<Output = PgResult<Vec<i64>>> + Send;

    /// Lists non-terminal helm deploy-stage runners started within the
    /// last `within_hours` hours, with the pipeline each one deploys.
    fn find_stuck_helm_runners(
        &mut self,
        within_hours: i64,
        pagination: OffsetPagination,
    ) -> impl Future<Output = PgResult<Vec<(CdWorkflowRunner, Pipeline)>>> + Send;

    /// Lists GitOps deploy-stage runners that are still non-terminal at
    /// least `stuck_for_seconds` after starting, with their pipelines.
    ///
    /// Only the newest runner per pipeline stage is considered, via the
    /// latest-runner index. Runners older than `within_hours` hours are
    /// left to manual intervention.
    fn find_stuck_gitops_runners(
        &mut self,
        stuck_for_seconds: i64,
        within_hours: i64,
        pagination: OffsetPagination,
    ) -> impl Future<Output = PgResult<Vec<(CdWorkflowRunner, Pipeline)>>> + Send;

    /// Counts runners retrying the given original attempt.
    fn count_runner_retries(
        &mut self,
        ref_runner_id: i64,
    ) -> impl Future<Output = PgResult<i64>> + Send;
}

impl CdWorkflowRunnerRepository for PgConnection {
    async fn create_cd_workflow_runner(
        &mut self,
        new_runner: NewCdWorkflowRunner,
    ) -> PgResult<CdWorkflowRunner> {
        use schema::cd_workflow_runner;

        let runner = diesel::insert_into(cd_workflow_runner::table)
            .values(&new_runner)
            .returning(CdWorkflowRunner::as_returning())
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        Ok(runner)
    }

    async fn save_runner_with_latest(
        &mut self,
        new_runner: NewCdWorkflowRunner,
        pipeline_id: i64,
        app_id: i64,
        environment_id: i64,
    ) -> PgResult<CdWorkflowRunner> {
        use diesel::dsl::now;
        use schema::{cd_workflow_runner, cd_workflow_status_latest};

        let runner = self
            .transaction::<_, PgError, _>(|conn| {
                async move {
                    let runner: CdWorkflowRunner =
                        diesel::insert_into(cd_workflow_runner::table)
                            .values(&new_runner)
                            .returning(CdWorkflowRunner::as_returning())
                            .get_result(conn)
                            .await?;

                    let latest = NewCdWorkflowStatusLatest {
                        pipeline_id,
                        app_id,
                        environment_id,
                        workflow_type: runner.workflow_type,
                        cd_workflow_runner_id: runner.id,
                    };

                    diesel::insert_into(cd_workflow_status_latest::table)
                        .values(&latest)
                        .on_conflict((
                            cd_workflow_status_latest::pipeline_id,
                            cd_workflow_status_latest::workflow_type,
                        ))
                        .do_update()
                        .set((
                            cd_workflow_status_latest::cd_workflow_runner_id.eq(runner.id),
                            cd_workflow_status_latest::updated_on.eq(now),
                        ))
                        .execute(conn)
                        .await?;

                    Ok(runner)
                }
                .scope_boxed()
            })
            .await?;

        Ok(runner)
    }

    async fn find_cd_workflow_runner_by_id(
        &mut self,
        runner_id: i64,
    ) -> PgResult<Option<CdWorkflowRunner>> {
        use schema::cd_workflow_runner::{self, dsl};

        let runner = cd_workflow_runner::table
            .filter(dsl::id.eq(runner_id))
            .select(CdWorkflowRunner::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(runner)
    }

    async fn find_latest_runner(
        &mut self,
        pipeline_id: i64,
        workflow_type: WorkflowType,
    ) -> PgResult<Option<CdWorkflowRunner>> {
        use schema::{cd_workflow, cd_workflow_runner};

        let runner = cd_workflow_runner::table
            .inner_join(
                cd_workflow::table.on(cd_workflow::id.eq(cd_workflow_runner::cd_workflow_id)),
            )
            .filter(cd_workflow::pipeline_id.eq(pipeline_id))
            .filter(cd_workflow_runner::workflow_type.eq(workflow_type))
            .order(cd_workflow_runner::id.desc())
            .select(CdWorkflowRunner::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(runner)
    }

    async fn find_current_runner(
        &mut self,
        pipeline_id: i64,
        workflow_type: WorkflowType,
    ) -> PgResult<Option<CdWorkflowRunner>> {
        use schema::cd_workflow_status_latest;

        let indexed: Option<i64> = cd_workflow_status_latest::table
            .filter(cd_workflow_status_latest::pipeline_id.eq(pipeline_id))
            .filter(cd_workflow_status_latest::workflow_type.eq(workflow_type))
            .select(cd_workflow_status_latest::cd_workflow_runner_id)
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        if let Some(runner_id) = indexed {
            if let Some(runner) = self.find_cd_workflow_runner_by_id(runner_id).await? {
                return Ok(Some(runner));
            }
        }

        self.find_latest_runner(pipeline_id, workflow_type).await
    }

    async fn is_latest_runner(
        &mut self,
        runner_id: i64,
        pipeline_id: i64,
        workflow_type: WorkflowType,
    ) -> PgResult<bool> {
        use diesel::dsl::{exists, not};
        use schema::{cd_workflow, cd_workflow_runner};

        let latest = diesel::select(not(exists(
            cd_workflow_runner::table
                .inner_join(
                    cd_workflow::table.on(cd_workflow::id.eq(cd_workflow_runner::cd_workflow_id)),
                )
                .filter(cd_workflow::pipeline_id.eq(pipeline_id))
                .filter(cd_workflow_runner::workflow_type.eq(workflow_type))
                .filter(cd_workflow_runner::id.gt(runner_id)),
        )))
        .get_result(self)
        .await
        .map_err(PgError::from)?;

        Ok(latest)
    }

    async fn find_active_runner(
        &mut self,
        cd_workflow_id: i64,
        workflow_type: WorkflowType,
    ) -> PgResult<Option<CdWorkflowRunner>> {
        use schema::cd_workflow_runner::{self, dsl};

        let runner = cd_workflow_runner::table
            .filter(dsl::cd_workflow_id.eq(cd_workflow_id))
            .filter(dsl::workflow_type.eq(workflow_type))
            .filter(dsl::status.ne_all(WorkflowRunnerStatus::TERMINAL.to_vec()))
            .order(dsl::id.desc())
            .select(CdWorkflowRunner::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(runner)
    }

    async fn find_runners_by_workflow(
        &mut self,
        cd_workflow_id: i64,
    ) -> PgResult<Vec<CdWorkflowRunner>> {
        use schema::cd_workflow_runner::{self, dsl};

        let runners = cd_workflow_runner::table
            .filter(dsl::cd_workflow_id.eq(cd_workflow_id))
            .order(dsl::id.desc())
            .select(CdWorkflowRunner::as_select())
            .load(self)
            .await
            .map_err(PgError::from)?;

        Ok(runners)
    }

    async fn update_cd_workflow_runner(
        &mut self,
        runner_id: i64,
        updates: UpdateCdWorkflowRunner,
    ) -> PgResult<CdWorkflowRunner> {
        use diesel::dsl::now;
        use schema::cd_workflow_runner::{self, dsl};

        let runner = diesel::update(cd_workflow_runner::table.filter(dsl::id.eq(runner_id)))
            .set((&updates, dsl::updated_on.eq(now)))
            .returning(CdWorkflowRunner::as_returning())
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        Ok(runner)
    }

    async fn update_runner_status(
        &mut self,
        runner_id: i64,
        status: WorkflowRunnerStatus,
        message: Option<String>,
    ) -> PgResult<CdWorkflowRunner> {
        use diesel::dsl::now;
        use schema::cd_workflow_runner::{self, dsl};

        let changes = UpdateCdWorkflowRunner {
            status: Some(status),
            message: message.map(Some),
            finished_on: status
                .is_terminal()
                .then(|| Some(jiff::Timestamp::now().into())),
            ..Default::default()
        };

        let updated = diesel::update(
            cd_workflow_runner::table
                .filter(dsl::id.eq(runner_id))
                .filter(dsl::status.ne_all(WorkflowRunnerStatus::TERMINAL.to_vec())),
        )
        .set((&changes, dsl::updated_on.eq(now)))
        .returning(CdWorkflowRunner::as_returning())
        .get_result(self)
        .await
        .optional()
        .map_err(PgError::from)?;

        match updated {
            Some(runner) => Ok(runner),
            None => {
                // The guarded update matched nothing: either the runner is
                // gone or it already reached a terminal status.
                let current = cd_workflow_runner::table
                    .filter(dsl::id.eq(runner_id))
                    .select(CdWorkflowRunner::as_select())
                    .first(self)
                    .await
                    .map_err(PgError::from)?;

                Err(PgError::TerminalTransition {
                    runner_id,
                    current: current.status,
                    requested: status,
                })
            }
        }
    }

    async fn update_nonterminal_status(
        &mut self,
        runner_id: i64,
        status: WorkflowRunnerStatus,
    ) -> PgResult<Option<CdWorkflowRunner>> {
        use diesel::dsl::now;
        use schema::cd_workflow_runner::{self, dsl};

        if status.is_terminal() {
            return Err(PgError::Unexpected(
                format!("unsupported status {status} for update operation").into(),
            ));
        }

        let updated = diesel::update(
            cd_workflow_runner::table
                .filter(dsl::id.eq(runner_id))
                .filter(dsl::status.ne_all(WorkflowRunnerStatus::TERMINAL.to_vec())),
        )
        .set((dsl::status.eq(status), dsl::updated_on.eq(now)))
        .returning(CdWorkflowRunner::as_returning())
        .get_result(self)
        .await
        .optional()
        .map_err(PgError::from)?;

        if updated.is_none() {
            tracing::warn!(
                target: TRACING_TARGET_QUERY,
                runner_id,
                requested = %status,
                "Skipping status update for terminal workflow runner"
            );
        }

        Ok(updated)
    }

    async fn find_previous_active_deploy_runners(
        &mut self,
        pipeline_id: i64,
        before_runner_id: i64,
    ) -> PgResult<Vec<CdWorkflowRunner>> {
        use schema::{cd_workflow, cd_workflow_runner};

        let runners = cd_workflow_runner::table
            .inner_join(
                cd_workflow::table.on(cd_workflow::id.eq(cd_workflow_runner::cd_workflow_id)),
            )
            .filter(cd_workflow::pipeline_id.eq(pipeline_id))
            .filter(cd_workflow_runner::workflow_type.eq(WorkflowType::Deploy))
            .filter(cd_workflow_runner::id.lt(before_runner_id))
            .filter(cd_workflow_runner::status.ne_all(WorkflowRunnerStatus::TERMINAL.to_vec()))
            .order(cd_workflow_runner::id.desc())
            .select(CdWorkflowRunner::as_select())
            .load(self)
            .await
            .map_err(PgError::from)?;

        Ok(runners)
    }

    async fn fail_runners_by_ids(
        &mut self,
        runner_ids: Vec<i64>,
        message: &str,
    ) -> PgResult<usize> {
        use diesel::dsl::now;
        use schema::cd_workflow_runner::{self, dsl};

        if runner_ids.is_empty() {
            return Ok(0);
        }

        let count = diesel::update(
            cd_workflow_runner::table
                .filter(dsl::id.eq_any(runner_ids))
                .filter(dsl::status.ne_all(WorkflowRunnerStatus::TERMINAL.to_vec())),
        )
        .set((
            dsl::status.eq(WorkflowRunnerStatus::Failed),
            dsl::message.eq(message),
            dsl::finished_on.eq(now),
            dsl::updated_on.eq(now),
        ))
        .execute(self)
        .await
        .map_err(PgError::from)?;

        Ok(count)
    }

    async fn supersede_previous_runners(
        &mut self,
        pipeline_id: i64,
        before_runner_id: i64,
        message: &str,
    ) -> PgResult<Vec<i64>> {
        let message = message.to_owned();
        let ids = self
            .transaction::<_, PgError, _>(|conn| {
                async move {
                    let previous = conn
                        .find_previous_active_deploy_runners(pipeline_id, before_runner_id)
                        .await?;
                    let ids: Vec<i64> = previous.into_iter().map(|runner| runner.id).collect();
                    if ids.is_empty() {
                        return Ok(ids);
                    }

                    conn.fail_runners_by_ids(ids.clone(), &message).await?;

                    for runner_id in &ids {
                        if conn.terminal_timeline_exists(*runner_id).await? {
                            continue;
                        }
                        conn.save_timeline(NewPipelineStatusTimeline::for_runner(
                            *runner_id,
                            TimelineStatus::Superseded,
                        ))
                        .await?;
                    }

                    Ok(ids)
                }
                .scope_boxed()
            })
            .await?;

        if !ids.is_empty() {
            tracing::debug!(
                target: TRACING_TARGET_QUERY,
                pipeline_id,
                before_runner_id,
                count = ids.len(),
                "Superseded previous deploy runners"
            );
        }

        Ok(ids)
    }

    async fn find_stuck_helm_runners(
        &mut self,
        within_hours: i64,
        pagination: OffsetPagination,
    ) -> PgResult<Vec<(CdWorkflowRunner, Pipeline)>> {
        use schema::{cd_workflow, cd_workflow_runner, pipeline};

        let cutoff: jiff_diesel::Timestamp = jiff::Timestamp::now()
            .saturating_sub(jiff::SignedDuration::from_hours(within_hours))
            .expect("saturating arithmetic with SignedDuration cannot fail")
            .into();

        let rows = cd_workflow_runner::table
            .inner_join(
                cd_workflow::table.on(cd_workflow::id.eq(cd_workflow_runner::cd_workflow_id)),
            )
            .inner_join(pipeline::table.on(pipeline::id.eq(cd_workflow::pipeline_id)))
            .filter(pipeline::deployment_app_type.eq(crate::types::DeploymentAppType::Helm))
            .filter(pipeline::deleted.eq(false))
            .filter(cd_workflow_runner::workflow_type.eq(WorkflowType::Deploy))
            .filter(cd_workflow_runner::status.ne_all(WorkflowRunnerStatus::TERMINAL.to_vec()))
            .filter(cd_workflow_runner::started_on.ge(&cutoff))
            .order(cd_workflow_runner::id.asc())
            .limit(pagination.limit)
            .offset(pagination.offset)
            .select((CdWorkflowRunner::as_select(), Pipeline::as_select()))
            .load::<(CdWorkflowRunner, Pipeline)>(self)
            .await
            .map_err(PgError::from)?;

        Ok(rows)
    }

    async fn find_stuck_gitops_runners(
        &mut self,
        stuck_for_seconds: i64,
        within_hours: i64,
        pagination: OffsetPagination,
    ) -> PgResult<Vec<(CdWorkflowRunner, Pipeline)>> {
        use schema::{cd_workflow_runner, cd_workflow_status_latest, pipeline};

        let now = jiff::Timestamp::now();
        let stale: jiff_diesel::Timestamp = now
            .saturating_sub(jiff::SignedDuration::from_secs(stuck_for_seconds))
            .expect("saturating arithmetic with SignedDuration cannot fail")
            .into();
        let cutoff: jiff_diesel::Timestamp = now
            .saturating_sub(jiff::SignedDuration::from_hours(within_hours))
            .expect("saturating arithmetic with SignedDuration cannot fail")
            .into();

        let rows = cd_workflow_status_latest::table
            .inner_join(
                cd_workflow_runner::table
                    .on(cd_workflow_runner::id.eq(cd_workflow_status_latest::cd_workflow_runner_id)),
            )
            .inner_join(pipeline::table.on(pipeline::id.eq(cd_workflow_status_latest::pipeline_id)))
            .filter(cd_workflow_status_latest::workflow_type.eq(WorkflowType::Deploy))
            .filter(pipeline::deployment_app_type.eq(crate::types::DeploymentAppType::Gitops))
            .filter(pipeline::deleted.eq(false))
            .filter(cd_workflow_runner::status.ne_all(WorkflowRunnerStatus::TERMINAL.to_vec()))
            .filter(cd_workflow_runner::started_on.le(&stale))
            .filter(cd_workflow_runner::started_on.ge(&cutoff))
            .order(cd_workflow_runner::id.asc())
            .limit(pagination.limit)
            .offset(pagination.offset)
            .select((CdWorkflowRunner::as_select(), Pipeline::as_select()))
            .load::<(CdWorkflowRunner, Pipeline)>(self)
            .await
            .map_err(PgError::from)?;

        Ok(rows)
    }

    async fn count_runner_retries(&mut self, ref_runner_id: i64) -> PgResult<i64> {
        use schema::cd_workflow_runner::{self, dsl};

        let count = cd_workflow_runner::table
            .filter(dsl::ref_cd_workflow_runner_id.eq(ref_runner_id))
            .count()
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        Ok(count)
    }
}
