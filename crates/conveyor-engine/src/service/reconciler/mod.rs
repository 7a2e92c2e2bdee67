//! Periodic reconciliation of in-flight deployments against the release
//! backends.
//!
//! Three sweeps run on independent intervals: the helm sweep polls
//! non-terminal helm runners, the argo sweep walks gitops runners that
//! stayed non-terminal past the stuck threshold, and the degradation
//! sweep re-enqueues sync requests for deployments whose manifests
//! applied without the application turning healthy. On-demand sync
//! requests from the bus funnel into the same per-runner checks.

mod argo;
mod helm;

use std::sync::Arc;

use conveyor_drivers::DriverError;
use conveyor_nats::stream::StatusSyncPublisher;
use conveyor_postgres::model::{CdWorkflowRunner, NewPipelineStatusTimeline, Pipeline};
use conveyor_postgres::query::{
    CdWorkflowRunnerRepository, PipelineStatusTimelineRepository, WorkflowStatusLatestRepository,
};
use conveyor_postgres::types::{TimelineStatus, WorkflowRunnerStatus, WorkflowType};
use conveyor_postgres::{PgConn, PgError};

use crate::Result;
use crate::metrics;
use crate::service::EngineState;
use crate::service::propagator::Propagator;
use crate::service::trigger::{load_pipeline, truncate_detail};

const TRACING_TARGET: &str = "conveyor_engine::reconciler";

/// Rows fetched per page by the periodic sweeps.
const SWEEP_PAGE_SIZE: i64 = 100;

/// Settles in-flight deploy runners by polling the release backends.
#[derive(Clone)]
pub struct Reconciler {
    state: EngineState,
    propagator: Arc<dyn Propagator>,
    sync_publisher: StatusSyncPublisher,
}

impl Reconciler {
    /// Creates the reconciler.
    pub fn new(
        state: EngineState,
        propagator: Arc<dyn Propagator>,
        sync_publisher: StatusSyncPublisher,
    ) -> Self {
        Self {
            state,
            propagator,
            sync_publisher,
        }
    }

    /// Re-checks the newest deploy runner of one pipeline right away.
    ///
    /// Serves the sync requests arriving over the bus. Pipelines with no
    /// indexed deploy runner, a finished runner, or a deleted pipeline
    /// row are skipped quietly.
    #[tracing::instrument(skip(self), target = TRACING_TARGET)]
    pub async fn reconcile_pipeline(&self, pipeline_id: i64) -> Result<()> {
        let mut conn = self.state.connection().await?;

        let Some(entry) = conn
            .find_latest_cd_entry(pipeline_id, WorkflowType::Deploy)
            .await?
        else {
            tracing::debug!(target: TRACING_TARGET, "No deploy runner indexed for pipeline");
            return Ok(());
        };
        let Some(runner) = conn
            .find_cd_workflow_runner_by_id(entry.cd_workflow_runner_id)
            .await?
        else {
            tracing::warn!(
                target: TRACING_TARGET,
                runner_id = entry.cd_workflow_runner_id,
                "Latest index references a missing runner"
            );
            return Ok(());
        };
        if runner.is_terminal() {
            tracing::debug!(
                target: TRACING_TARGET,
                runner_id = runner.id,
                status = %runner.status,
                "Deploy runner already settled"
            );
            return Ok(());
        }

        let pipeline = load_pipeline(&mut conn, pipeline_id).await?;
        if pipeline.is_deleted() {
            tracing::debug!(target: TRACING_TARGET, "Skipping deleted pipeline");
            return Ok(());
        }

        if pipeline.is_helm() {
            self.check_helm_runner(&mut conn, &runner, &pipeline).await
        } else {
            self.check_gitops_runner(&mut conn, &runner, &pipeline)
                .await
        }
    }

    /// Marks a runner succeeded and runs the success follow-ups.
    ///
    /// The runner is stepped through the intermediate statuses first so
    /// the lifecycle stays well-formed. A runner that turned terminal
    /// under us is left as it is.
    pub(super) async fn succeed_runner(
        &self,
        conn: &mut PgConn,
        runner: &CdWorkflowRunner,
        pipeline: &Pipeline,
    ) -> Result<()> {
        for &step in path_to_running(runner.status) {
            if conn.update_nonterminal_status(runner.id, step).await?.is_none() {
                return Ok(());
            }
        }

        let succeeded = match conn
            .update_runner_status(runner.id, WorkflowRunnerStatus::Succeeded, None)
            .await
        {
            Ok(updated) => updated,
            Err(PgError::TerminalTransition { current, .. }) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    runner_id = runner.id,
                    current = %current,
                    "Runner finished before the success mark"
                );
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        conn.save_timeline_if_not_already_present(NewPipelineStatusTimeline::for_runner(
            runner.id,
            TimelineStatus::DeploymentSucceeded,
        ))
        .await?;

        if self.state.config.expose_cd_metrics {
            metrics::deployment_finished(pipeline, succeeded.status, succeeded.duration_seconds());
        }
        tracing::info!(
            target: TRACING_TARGET,
            runner_id = runner.id,
            pipeline_id = pipeline.id,
            "Deployment succeeded"
        );

        if let Err(err) = self.propagator.handle_deployment_success(runner.id).await {
            tracing::error!(
                target: TRACING_TARGET,
                runner_id = runner.id,
                error = %err,
                "Propagation after deployment success failed"
            );
        }
        Ok(())
    }

    /// Steps a runner that shows cluster progress up to `Running`.
    pub(super) async fn ensure_running(
        &self,
        conn: &mut PgConn,
        runner: &CdWorkflowRunner,
    ) -> Result<()> {
        for &step in path_to_running(runner.status) {
            if conn.update_nonterminal_status(runner.id, step).await?.is_none() {
                break;
            }
        }
        Ok(())
    }

    /// Records a failed status poll: the fetch-problem marker replaces
    /// its previous row and the runner moves to `UnableToFetch` where
    /// the lifecycle allows it.
    pub(super) async fn record_fetch_problem(
        &self,
        conn: &mut PgConn,
        runner: &CdWorkflowRunner,
        err: &DriverError,
        detail: Option<String>,
    ) -> Result<()> {
        tracing::warn!(
            target: TRACING_TARGET,
            runner_id = runner.id,
            error = %err,
            "Failed to fetch release status"
        );

        let marker = if err.is_timeout() {
            TimelineStatus::FetchTimedOut
        } else {
            TimelineStatus::UnableToFetch
        };
        let mut timeline = NewPipelineStatusTimeline::for_runner(runner.id, marker);
        if let Some(detail) = detail {
            timeline = timeline.with_detail(truncate_detail(&detail));
        }
        conn.save_timeline(timeline).await?;

        if runner
            .status
            .can_transition_to(WorkflowRunnerStatus::UnableToFetch)
        {
            conn.update_nonterminal_status(runner.id, WorkflowRunnerStatus::UnableToFetch)
                .await?;
        }
        Ok(())
    }
}

/// Non-terminal statuses to apply, in order, to move a runner from
/// `current` up to `Running`.
pub(crate) fn path_to_running(current: WorkflowRunnerStatus) -> &'static [WorkflowRunnerStatus] {
    use WorkflowRunnerStatus::{Queued, Running, Starting, UnableToFetch};

    match current {
        Queued => &[Starting, Running],
        Starting | UnableToFetch => &[Running],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn running_paths_follow_the_lifecycle() {
        for from in WorkflowRunnerStatus::iter() {
            let mut current = from;
            for &step in path_to_running(from) {
                assert!(
                    current.can_transition_to(step),
                    "{current} must not step to {step}"
                );
                current = step;
            }
        }
    }

    #[test]
    fn active_statuses_reach_running() {
        for from in [
            WorkflowRunnerStatus::Queued,
            WorkflowRunnerStatus::Starting,
            WorkflowRunnerStatus::UnableToFetch,
        ] {
            assert_eq!(
                path_to_running(from).last(),
                Some(&WorkflowRunnerStatus::Running)
            );
        }
    }

    #[test]
    fn settled_statuses_have_no_path() {
        assert!(path_to_running(WorkflowRunnerStatus::Running).is_empty());
        for from in WorkflowRunnerStatus::TERMINAL {
            assert!(path_to_running(from).is_empty());
        }
    }

    #[test]
    fn running_can_settle_after_every_path() {
        for from in [
            WorkflowRunnerStatus::Queued,
            WorkflowRunnerStatus::Starting,
            WorkflowRunnerStatus::UnableToFetch,
        ] {
            let last = path_to_running(from).last().copied();
            assert!(
                last.is_some_and(|status| {
                    status.can_transition_to(WorkflowRunnerStatus::Succeeded)
                }),
                "{from} path must end where success is reachable"
            );
        }
    }
}
