//! GitOps deployment reconciliation sweeps.

use conveyor_drivers::{AppIdentifier, AppStatus};
use conveyor_nats::stream::PipelineStatusSyncEvent;
use conveyor_postgres::model::{
    CdWorkflowRunner, NewDeploymentAppStatus, NewPipelineStatusTimeline, Pipeline,
};
use conveyor_postgres::query::{
    CdWorkflowRepository, CdWorkflowRunnerRepository, DeploymentAppStatusRepository,
    PipelineStatusSyncDetailRepository, PipelineStatusTimelineRepository,
};
use conveyor_postgres::types::constants::timeline::SYNC_GUARD_SECONDS;
use conveyor_postgres::types::constants::workflow::{ARGO_RECONCILE_WINDOW_HOURS, SYSTEM_USER_ID};
use conveyor_postgres::types::{OffsetPagination, TimelineStatus};
use conveyor_postgres::PgConn;

use super::{Reconciler, SWEEP_PAGE_SIZE, TRACING_TARGET};
use crate::metrics;
use crate::service::trigger::fail_deployment;
use crate::Result;

const DEGRADED_MESSAGE: &str = "application health status is Degraded.";

impl Reconciler {
    /// Walks gitops deploy runners that stayed non-terminal past the
    /// stuck threshold and settles each one against the live
    /// application.
    #[tracing::instrument(skip(self), target = TRACING_TARGET)]
    pub async fn run_argo_sweep(&self) -> Result<usize> {
        let mut conn = self.state.connection().await?;
        let stuck_for = self.state.config.argocd_stuck_threshold_secs();

        let mut offset = 0;
        let mut processed = 0;
        loop {
            let page = OffsetPagination::new(SWEEP_PAGE_SIZE, offset);
            let rows = conn
                .find_stuck_gitops_runners(stuck_for, ARGO_RECONCILE_WINDOW_HOURS, page)
                .await?;
            let fetched = rows.len();

            for (runner, pipeline) in rows {
                if let Err(err) = self.check_gitops_runner(&mut conn, &runner, &pipeline).await {
                    tracing::error!(
                        target: TRACING_TARGET,
                        runner_id = runner.id,
                        pipeline_id = pipeline.id,
                        error = %err,
                        "Gitops status check failed"
                    );
                }
                processed += 1;
            }

            if (fetched as i64) < SWEEP_PAGE_SIZE {
                break;
            }
            offset += SWEEP_PAGE_SIZE;
        }

        if self.state.config.expose_cd_metrics {
            metrics::sweep_completed("argo", processed);
        }
        Ok(processed)
    }

    /// Re-enqueues sync requests for deployments whose manifests applied
    /// without the application turning healthy inside the degradation
    /// threshold.
    #[tracing::instrument(skip(self), target = TRACING_TARGET)]
    pub async fn run_degradation_sweep(&self) -> Result<usize> {
        let mut conn = self.state.connection().await?;
        let threshold = self.state.config.argocd_degradation_threshold_secs;

        let mut offset = 0;
        let mut requested = 0;
        loop {
            let page = OffsetPagination::new(SWEEP_PAGE_SIZE, offset);
            let runner_ids = conn.find_runner_ids_stuck_after_apply(threshold, page).await?;
            let fetched = runner_ids.len();

            for runner_id in runner_ids {
                let Some(runner) = conn.find_cd_workflow_runner_by_id(runner_id).await? else {
                    continue;
                };
                if runner.is_terminal() {
                    continue;
                }
                if let Some(detail) = conn.find_sync_detail_by_runner(runner.id).await? {
                    if detail.synced_within(SYNC_GUARD_SECONDS) {
                        continue;
                    }
                }
                let Some(envelope) = conn.find_cd_workflow_by_id(runner.cd_workflow_id).await?
                else {
                    continue;
                };

                let event =
                    PipelineStatusSyncEvent::for_pipeline(envelope.pipeline_id, SYSTEM_USER_ID);
                self.sync_publisher.publish(&event).await?;
                tracing::debug!(
                    target: TRACING_TARGET,
                    runner_id = runner.id,
                    pipeline_id = envelope.pipeline_id,
                    "Requested status sync for stalled deployment"
                );
                requested += 1;
            }

            if (fetched as i64) < SWEEP_PAGE_SIZE {
                break;
            }
            offset += SWEEP_PAGE_SIZE;
        }

        if self.state.config.expose_cd_metrics {
            metrics::sweep_completed("degradation", requested);
        }
        Ok(requested)
    }

    /// Settles one gitops runner against the live application status.
    ///
    /// Also serves flux pipelines reached through on-demand sync
    /// requests: both backends surface the same application shape.
    pub(super) async fn check_gitops_runner(
        &self,
        conn: &mut PgConn,
        runner: &CdWorkflowRunner,
        pipeline: &Pipeline,
    ) -> Result<()> {
        // Another actor polled this runner moments ago; its observation
        // is still fresh.
        if let Some(detail) = conn.find_sync_detail_by_runner(runner.id).await? {
            if detail.synced_within(SYNC_GUARD_SECONDS) {
                tracing::debug!(
                    target: TRACING_TARGET,
                    runner_id = runner.id,
                    "Skipping freshly polled runner"
                );
                return Ok(());
            }
        }
        conn.record_runner_sync(runner.id).await?;

        let app = AppIdentifier::from_pipeline(pipeline);

        // Manual-sync installations need the sync kicked exactly once
        // before status can move.
        if !self.state.config.argocd_auto_sync_enabled {
            let (kicked, _) = conn
                .save_timeline_if_not_already_present(NewPipelineStatusTimeline::for_runner(
                    runner.id,
                    TimelineStatus::ArgocdSyncInitiated,
                ))
                .await?;
            if kicked {
                if let Err(err) = self
                    .state
                    .drivers
                    .sync(pipeline.deployment_app_type, &app)
                    .await
                {
                    let reason =
                        format!("error occurred in syncing argocd application. err: {err}");
                    fail_deployment(&self.state.config, conn, runner, pipeline, &reason, false)
                        .await?;
                    return Ok(());
                }
            }
        }

        let status = match self
            .state
            .drivers
            .status(pipeline.deployment_app_type, &app)
            .await
        {
            Ok(status) => status,
            Err(err) => {
                self.record_fetch_problem(conn, runner, &err, None).await?;
                return Ok(());
            }
        };

        // Every observation refreshes the per-environment health table,
        // settled or not.
        let observation = NewDeploymentAppStatus {
            app_id: pipeline.app_id,
            environment_id: pipeline.environment_id,
            status: status.health.to_string(),
        };
        if let Err(err) = conn.upsert_deployment_app_status(observation).await {
            tracing::warn!(
                target: TRACING_TARGET,
                app_id = pipeline.app_id,
                environment_id = pipeline.environment_id,
                error = %err,
                "Failed to record application health"
            );
        }

        if status.operation_succeeded() {
            conn.save_timeline_if_not_already_present(NewPipelineStatusTimeline::for_runner(
                runner.id,
                TimelineStatus::ArgocdSyncCompleted,
            ))
            .await?;
        }

        let started_on: jiff::Timestamp = runner.started_on.into();
        match derive_gitops_verdict(&status, started_on) {
            GitopsVerdict::Succeeded => {
                self.mark_manifest_applied(conn, runner).await?;
                conn.save_timeline_if_not_already_present(NewPipelineStatusTimeline::for_runner(
                    runner.id,
                    TimelineStatus::AppHealthy,
                ))
                .await?;
                self.succeed_runner(conn, runner, pipeline).await
            }
            GitopsVerdict::Applied => {
                self.mark_manifest_applied(conn, runner).await?;
                self.ensure_running(conn, runner).await
            }
            GitopsVerdict::Degraded => {
                self.mark_manifest_applied(conn, runner).await?;
                if runner_age_secs(runner) >= self.state.config.argocd_degradation_threshold_secs {
                    fail_deployment(
                        &self.state.config,
                        conn,
                        runner,
                        pipeline,
                        DEGRADED_MESSAGE,
                        false,
                    )
                    .await
                } else {
                    // Degradation is routine mid-rollout; only a report
                    // past the threshold settles the runner.
                    self.ensure_running(conn, runner).await
                }
            }
            GitopsVerdict::OperationFailed(reason) => {
                fail_deployment(&self.state.config, conn, runner, pipeline, &reason, false).await
            }
            GitopsVerdict::Pending => self.ensure_running(conn, runner).await,
        }
    }

    async fn mark_manifest_applied(
        &self,
        conn: &mut PgConn,
        runner: &CdWorkflowRunner,
    ) -> Result<()> {
        conn.save_timeline_if_not_already_present(NewPipelineStatusTimeline::for_runner(
            runner.id,
            TimelineStatus::KubectlApplySynced,
        ))
        .await?;
        Ok(())
    }
}

/// What the sweep does with a gitops runner, decided from the observed
/// application status.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum GitopsVerdict {
    /// Manifest applied on the current revision and application healthy.
    Succeeded,
    /// Manifest applied, workloads still converging.
    Applied,
    /// Manifest applied but the application reports degraded health.
    Degraded,
    /// The sync operation failed.
    OperationFailed(String),
    /// The manifest has not reached the cluster yet.
    Pending,
}

/// Derives the sweep verdict for a gitops runner.
///
/// An observation only counts once the application is synced AND the
/// last deploy the backend reports is not older than this runner; an
/// earlier deployment's healthy state must not settle a newer runner.
pub(crate) fn derive_gitops_verdict(
    status: &AppStatus,
    runner_started_on: jiff::Timestamp,
) -> GitopsVerdict {
    if status.operation_phase.is_some_and(|phase| phase.is_failed()) {
        let reason = status
            .description
            .clone()
            .unwrap_or_else(|| "sync operation failed".to_owned());
        return GitopsVerdict::OperationFailed(reason);
    }

    let synced = status.sync_status.is_some_and(|sync| sync.is_synced());
    let observed_is_current = status
        .last_deployed_at
        .map_or(true, |at| at >= runner_started_on);
    if !synced || !observed_is_current {
        return GitopsVerdict::Pending;
    }

    if status.health.is_healthy() {
        GitopsVerdict::Succeeded
    } else if status.health.is_degraded() {
        GitopsVerdict::Degraded
    } else {
        GitopsVerdict::Applied
    }
}

fn runner_age_secs(runner: &CdWorkflowRunner) -> i64 {
    let started_on: jiff::Timestamp = runner.started_on.into();
    jiff::Timestamp::now().duration_since(started_on).as_secs()
}

#[cfg(test)]
mod tests {
    use conveyor_drivers::{HealthStatus, OperationPhase, ReleaseStatus, SyncStatus};

    use super::*;

    fn status(sync: SyncStatus, health: HealthStatus) -> AppStatus {
        AppStatus {
            health,
            release_status: ReleaseStatus::Deployed,
            sync_status: Some(sync),
            operation_phase: Some(OperationPhase::Succeeded),
            synced_revision: Some("5e66fa1".to_owned()),
            last_deployed_at: None,
            description: None,
        }
    }

    fn started() -> jiff::Timestamp {
        jiff::Timestamp::now()
    }

    #[test]
    fn synced_and_healthy_succeeds() {
        let verdict = derive_gitops_verdict(&status(SyncStatus::Synced, HealthStatus::Healthy), started());
        assert_eq!(verdict, GitopsVerdict::Succeeded);
    }

    #[test]
    fn synced_but_progressing_is_applied() {
        let verdict = derive_gitops_verdict(
            &status(SyncStatus::Synced, HealthStatus::Progressing),
            started(),
        );
        assert_eq!(verdict, GitopsVerdict::Applied);
    }

    #[test]
    fn synced_but_degraded_is_degraded() {
        let verdict = derive_gitops_verdict(
            &status(SyncStatus::Synced, HealthStatus::Degraded),
            started(),
        );
        assert_eq!(verdict, GitopsVerdict::Degraded);
    }

    #[test]
    fn out_of_sync_is_pending_whatever_the_health() {
        for health in [HealthStatus::Healthy, HealthStatus::Degraded] {
            let verdict = derive_gitops_verdict(&status(SyncStatus::OutOfSync, health), started());
            assert_eq!(verdict, GitopsVerdict::Pending);
        }
    }

    #[test]
    fn stale_observation_does_not_settle_a_newer_runner() {
        let runner_started = jiff::Timestamp::now();
        let mut observed = status(SyncStatus::Synced, HealthStatus::Healthy);
        observed.last_deployed_at =
            Some(runner_started.saturating_sub(jiff::SignedDuration::from_mins(10)).unwrap());

        let verdict = derive_gitops_verdict(&observed, runner_started);
        assert_eq!(verdict, GitopsVerdict::Pending);
    }

    #[test]
    fn current_observation_settles_the_runner() {
        let runner_started = jiff::Timestamp::now();
        let mut observed = status(SyncStatus::Synced, HealthStatus::Healthy);
        observed.last_deployed_at =
            Some(runner_started.saturating_add(jiff::SignedDuration::from_secs(30)).unwrap());

        let verdict = derive_gitops_verdict(&observed, runner_started);
        assert_eq!(verdict, GitopsVerdict::Succeeded);
    }

    #[test]
    fn failed_operation_wins_over_everything() {
        let mut observed = status(SyncStatus::Synced, HealthStatus::Healthy);
        observed.operation_phase = Some(OperationPhase::Failed);
        observed.description = Some("ComparisonError: repo unreachable".to_owned());

        let verdict = derive_gitops_verdict(&observed, started());
        assert_eq!(
            verdict,
            GitopsVerdict::OperationFailed("ComparisonError: repo unreachable".to_owned())
        );
    }

    #[test]
    fn missing_sync_status_is_pending() {
        let mut observed = status(SyncStatus::Synced, HealthStatus::Healthy);
        observed.sync_status = None;

        let verdict = derive_gitops_verdict(&observed, started());
        assert_eq!(verdict, GitopsVerdict::Pending);
    }
}
