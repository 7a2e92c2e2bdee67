//! Helm release reconciliation sweep.

use conveyor_drivers::{AppIdentifier, AppStatus, DriverError};
use conveyor_postgres::model::{CdWorkflowRunner, Pipeline};
use conveyor_postgres::query::CdWorkflowRunnerRepository;
use conveyor_postgres::types::constants::workflow::HELM_RECONCILE_WINDOW_HOURS;
use conveyor_postgres::types::{DeploymentAppType, OffsetPagination};
use conveyor_postgres::PgConn;

use super::{Reconciler, SWEEP_PAGE_SIZE, TRACING_TARGET};
use crate::metrics;
use crate::service::trigger::{fail_deployment, SUPERSEDED_MESSAGE};
use crate::Result;

impl Reconciler {
    /// Walks non-terminal helm deploy runners inside the reconcile
    /// window and settles each one against the live release.
    ///
    /// Returns the number of runners checked. Per-runner errors are
    /// logged and the sweep moves on.
    #[tracing::instrument(skip(self), target = TRACING_TARGET)]
    pub async fn run_helm_sweep(&self) -> Result<usize> {
        let mut conn = self.state.connection().await?;

        let mut offset = 0;
        let mut processed = 0;
        loop {
            let page = OffsetPagination::new(SWEEP_PAGE_SIZE, offset);
            let rows = conn
                .find_stuck_helm_runners(HELM_RECONCILE_WINDOW_HOURS, page)
                .await?;
            let fetched = rows.len();

            for (runner, pipeline) in rows {
                if let Err(err) = self.check_helm_runner(&mut conn, &runner, &pipeline).await {
                    tracing::error!(
                        target: TRACING_TARGET,
                        runner_id = runner.id,
                        pipeline_id = pipeline.id,
                        error = %err,
                        "Helm status check failed"
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
            metrics::sweep_completed("helm", processed);
        }
        Ok(processed)
    }

    /// Settles one helm runner against the live release status.
    pub(super) async fn check_helm_runner(
        &self,
        conn: &mut PgConn,
        runner: &CdWorkflowRunner,
        pipeline: &Pipeline,
    ) -> Result<()> {
        let app = AppIdentifier::from_pipeline(pipeline);
        let status = match self.state.drivers.status(DeploymentAppType::Helm, &app).await {
            Ok(status) => status,
            Err(err @ DriverError::ReleaseNotFound(_)) => {
                // The release is gone; this deployment can never settle.
                fail_deployment(
                    &self.state.config,
                    conn,
                    runner,
                    pipeline,
                    &err.to_string(),
                    false,
                )
                .await?;
                return Ok(());
            }
            Err(err) => {
                let detail = err.to_string();
                self.record_fetch_problem(conn, runner, &err, Some(detail))
                    .await?;
                return Ok(());
            }
        };

        match classify_helm_status(&status) {
            HelmVerdict::Succeeded => self.succeed_runner(conn, runner, pipeline).await,
            HelmVerdict::Superseded => {
                fail_deployment(
                    &self.state.config,
                    conn,
                    runner,
                    pipeline,
                    SUPERSEDED_MESSAGE,
                    true,
                )
                .await
            }
            HelmVerdict::Failed(reason) => {
                fail_deployment(&self.state.config, conn, runner, pipeline, &reason, false).await
            }
            HelmVerdict::StillRolling => self.ensure_running(conn, runner).await,
        }
    }
}

/// What the sweep does with a helm runner, decided from the release
/// status alone.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum HelmVerdict {
    Succeeded,
    Superseded,
    Failed(String),
    StillRolling,
}

pub(crate) fn classify_helm_status(status: &AppStatus) -> HelmVerdict {
    if status.release_status.is_superseded() {
        HelmVerdict::Superseded
    } else if status.release_status.is_failed() {
        let reason = status
            .description
            .clone()
            .unwrap_or_else(|| "helm release reported a failed status".to_owned());
        HelmVerdict::Failed(reason)
    } else if status.is_deployed_and_healthy() {
        HelmVerdict::Succeeded
    } else {
        HelmVerdict::StillRolling
    }
}

#[cfg(test)]
mod tests {
    use conveyor_drivers::{HealthStatus, ReleaseStatus};

    use super::*;

    fn status(release_status: ReleaseStatus, health: HealthStatus) -> AppStatus {
        AppStatus {
            health,
            release_status,
            sync_status: None,
            operation_phase: None,
            synced_revision: None,
            last_deployed_at: None,
            description: None,
        }
    }

    #[test]
    fn deployed_and_healthy_succeeds() {
        let verdict = classify_helm_status(&status(ReleaseStatus::Deployed, HealthStatus::Healthy));
        assert_eq!(verdict, HelmVerdict::Succeeded);
    }

    #[test]
    fn deployed_but_unhealthy_keeps_rolling() {
        for health in [HealthStatus::Progressing, HealthStatus::Degraded] {
            let verdict = classify_helm_status(&status(ReleaseStatus::Deployed, health));
            assert_eq!(verdict, HelmVerdict::StillRolling);
        }
    }

    #[test]
    fn pending_release_keeps_rolling() {
        let verdict = classify_helm_status(&status(
            ReleaseStatus::PendingUpgrade,
            HealthStatus::Progressing,
        ));
        assert_eq!(verdict, HelmVerdict::StillRolling);
    }

    #[test]
    fn failed_release_fails_with_backend_detail() {
        let mut failed = status(ReleaseStatus::Failed, HealthStatus::Degraded);
        failed.description = Some("post-install hook timed out".to_owned());
        let verdict = classify_helm_status(&failed);
        assert_eq!(
            verdict,
            HelmVerdict::Failed("post-install hook timed out".to_owned())
        );
    }

    #[test]
    fn failed_release_without_detail_gets_a_generic_reason() {
        let verdict = classify_helm_status(&status(ReleaseStatus::Failed, HealthStatus::Unknown));
        let HelmVerdict::Failed(reason) = verdict else {
            panic!("expected a failure verdict");
        };
        assert!(reason.contains("failed status"));
    }

    #[test]
    fn superseded_release_wins_over_health() {
        let verdict =
            classify_helm_status(&status(ReleaseStatus::Superseded, HealthStatus::Healthy));
        assert_eq!(verdict, HelmVerdict::Superseded);
    }
}
