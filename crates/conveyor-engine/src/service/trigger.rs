//! Stage trigger entry points and the deploy request orchestrator.

use std::time::Duration;

use conveyor_drivers::{
    AppIdentifier, DriverError, DriverRegistry, InstallRequest, InstallResult,
};
use conveyor_nats::stream::{DeployRequest, DeployRequestPublisher};
use conveyor_postgres::model::{
    CdWorkflow, CdWorkflowRunner, CiArtifact, NewCdWorkflow, NewCdWorkflowRunner,
    NewPipelineStatusTimeline, Pipeline,
};
use conveyor_postgres::query::{
    CdWorkflowRepository, CdWorkflowRunnerRepository, CiArtifactRepository, PipelineRepository,
    PipelineStatusTimelineRepository,
};
use conveyor_postgres::types::constants::timeline;
use conveyor_postgres::types::{
    CdWorkflowStatus, DeploymentAppType, TimelineStatus, WorkflowExecutorType,
    WorkflowRunnerStatus, WorkflowType,
};
use conveyor_postgres::{PgConn, PgError};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::metrics;
use crate::service::contexts::ReleaseContexts;
use crate::service::{EngineConfig, EngineState};
use crate::{EngineError, Result};

const TRACING_TARGET: &str = "conveyor_engine::trigger";

/// Message stamped on deploy runners overtaken by a newer deployment.
pub const SUPERSEDED_MESSAGE: &str = "This deployment is superseded by a newer deployment.";

/// Classified result of handling one deploy request.
#[derive(Debug)]
pub enum TriggerOutcome {
    /// The driver accepted the release; the reconciler takes over.
    Completed,
    /// The runner already reached a terminal status before the call.
    AlreadyFinished,
    /// The driver call exceeded its budget.
    Deadline,
    /// A newer deployment for the same release overtook this one.
    Superseded,
    /// The process is shutting down; nothing was persisted and the
    /// message redelivers after restart.
    Shutdown,
    /// The driver reported a failure and the runner was failed.
    Failed(DriverError),
}

impl TriggerOutcome {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::AlreadyFinished => "already_finished",
            Self::Deadline => "deadline",
            Self::Superseded => "superseded",
            Self::Shutdown => "shutdown",
            Self::Failed(_) => "failed",
        }
    }
}

/// Parameters for triggering a pipeline stage.
#[derive(Debug, Clone)]
pub struct StageTriggerRequest {
    /// Pipeline whose stage fires.
    pub pipeline_id: i64,
    /// Artifact the stage runs against.
    pub ci_artifact_id: i64,
    /// User the trigger is attributed to.
    pub triggered_by: i64,
    /// Workflow envelope from an earlier stage, when one exists.
    pub cd_workflow_id: Option<i64>,
    /// Original attempt this trigger retries.
    pub ref_runner_id: Option<i64>,
    /// Request an immediate sync even when auto-sync is enabled.
    pub force_sync: bool,
}

impl StageTriggerRequest {
    /// Creates a trigger request for a pipeline and artifact.
    pub fn new(pipeline_id: i64, ci_artifact_id: i64, triggered_by: i64) -> Self {
        Self {
            pipeline_id,
            ci_artifact_id,
            triggered_by,
            cd_workflow_id: None,
            ref_runner_id: None,
            force_sync: false,
        }
    }

    /// Reuses the workflow envelope created by an earlier stage.
    pub fn with_workflow(mut self, cd_workflow_id: i64) -> Self {
        self.cd_workflow_id = Some(cd_workflow_id);
        self
    }

    /// Links the trigger to the original attempt it retries.
    pub fn with_ref_runner(mut self, ref_runner_id: i64) -> Self {
        self.ref_runner_id = Some(ref_runner_id);
        self
    }
}

/// Trigger entry points for pipeline stages and the orchestrator that
/// consumes queued deploy requests.
///
/// Accepting a trigger is synchronous and cheap: it writes the workflow
/// rows and enqueues a message. The driver call happens later on the
/// worker, under a per-release lock, a time budget, and a cancellation
/// token a newer deployment can fire.
#[derive(Clone)]
pub struct TriggerService {
    state: EngineState,
    contexts: ReleaseContexts,
    publisher: DeployRequestPublisher,
}

impl TriggerService {
    /// Creates the service, ensuring the deploy trigger stream exists.
    pub async fn new(state: EngineState) -> Result<Self> {
        let publisher = state.nats.deploy_request_publisher().await?;
        Ok(Self {
            state,
            contexts: ReleaseContexts::default(),
            publisher,
        })
    }

    /// Creates a pre-stage runner, reusing or creating the workflow
    /// envelope.
    #[tracing::instrument(skip(self, request), fields(pipeline_id = request.pipeline_id), target = TRACING_TARGET)]
    pub async fn trigger_pre_stage(
        &self,
        request: StageTriggerRequest,
    ) -> Result<CdWorkflowRunner> {
        self.trigger_hook_stage(WorkflowType::Pre, request).await
    }

    /// Creates a post-stage runner, reusing or creating the workflow
    /// envelope.
    #[tracing::instrument(skip(self, request), fields(pipeline_id = request.pipeline_id), target = TRACING_TARGET)]
    pub async fn trigger_post_stage(
        &self,
        request: StageTriggerRequest,
    ) -> Result<CdWorkflowRunner> {
        self.trigger_hook_stage(WorkflowType::Post, request).await
    }

    /// Accepts a deployment: creates the deploy runner in `Queued`,
    /// stamps the queued timeline, and enqueues the deploy request.
    #[tracing::instrument(skip(self, request), fields(pipeline_id = request.pipeline_id), target = TRACING_TARGET)]
    pub async fn trigger_automatic_deployment(
        &self,
        request: StageTriggerRequest,
    ) -> Result<CdWorkflowRunner> {
        let mut conn = self.state.connection().await?;
        let pipeline = load_pipeline(&mut conn, request.pipeline_id).await?;
        let artifact = load_artifact(&mut conn, request.ci_artifact_id).await?;
        let workflow = resolve_workflow(&mut conn, &pipeline, &request).await?;

        let runner = conn
            .save_runner_with_latest(
                NewCdWorkflowRunner {
                    cd_workflow_id: workflow.id,
                    workflow_type: WorkflowType::Deploy,
                    executor_type: WorkflowExecutorType::System,
                    status: Some(WorkflowRunnerStatus::Queued),
                    started_on: Some(jiff::Timestamp::now().into()),
                    triggered_by: request.triggered_by,
                    ref_cd_workflow_runner_id: request.ref_runner_id,
                    namespace: Some(pipeline.environment_name.clone()),
                    ..Default::default()
                },
                pipeline.id,
                pipeline.app_id,
                pipeline.environment_id,
            )
            .await?;

        conn.save_timeline(NewPipelineStatusTimeline::for_runner(
            runner.id,
            TimelineStatus::Queued,
        ))
        .await?;

        let deploy = DeployRequest {
            request_id: Uuid::new_v4(),
            pipeline_id: pipeline.id,
            app_id: pipeline.app_id,
            env_id: pipeline.environment_id,
            ci_artifact_id: artifact.id,
            cd_workflow_id: workflow.id,
            wfr_id: runner.id,
            user_id: request.triggered_by,
            deployment_app_type: pipeline.deployment_app_type.to_string().to_ascii_lowercase(),
            force_sync: request.force_sync,
            triggered_at: jiff::Timestamp::now(),
        };
        self.publisher
            .publish_with_id(&deploy, &deploy.message_id())
            .await?;

        conn.update_cd_workflow_status(workflow.id, CdWorkflowStatus::Enqueued)
            .await?;

        tracing::info!(
            target: TRACING_TARGET,
            runner_id = runner.id,
            cd_workflow_id = workflow.id,
            artifact_id = artifact.id,
            "Deployment accepted and enqueued"
        );
        Ok(runner)
    }

    /// Routes a bulk trigger to the pre stage when one is configured,
    /// otherwise straight to deployment.
    pub async fn trigger_stage_for_bulk(
        &self,
        request: StageTriggerRequest,
    ) -> Result<CdWorkflowRunner> {
        let mut conn = self.state.connection().await?;
        let pipeline = load_pipeline(&mut conn, request.pipeline_id).await?;
        drop(conn);

        if pipeline.has_pre_stage() {
            self.trigger_pre_stage(request).await
        } else {
            self.trigger_automatic_deployment(request).await
        }
    }

    async fn trigger_hook_stage(
        &self,
        stage: WorkflowType,
        request: StageTriggerRequest,
    ) -> Result<CdWorkflowRunner> {
        let mut conn = self.state.connection().await?;
        let pipeline = load_pipeline(&mut conn, request.pipeline_id).await?;
        let workflow = resolve_workflow(&mut conn, &pipeline, &request).await?;

        let runner = conn
            .save_runner_with_latest(
                NewCdWorkflowRunner {
                    cd_workflow_id: workflow.id,
                    workflow_type: stage,
                    executor_type: WorkflowExecutorType::ArgoWorkflow,
                    status: Some(WorkflowRunnerStatus::Starting),
                    started_on: Some(jiff::Timestamp::now().into()),
                    triggered_by: request.triggered_by,
                    ref_cd_workflow_runner_id: request.ref_runner_id,
                    namespace: Some(pipeline.environment_name.clone()),
                    ..Default::default()
                },
                pipeline.id,
                pipeline.app_id,
                pipeline.environment_id,
            )
            .await?;

        tracing::info!(
            target: TRACING_TARGET,
            runner_id = runner.id,
            cd_workflow_id = workflow.id,
            stage = %stage,
            "Triggered hook stage"
        );
        Ok(runner)
    }

    /// Handles one deploy request from the work queue.
    ///
    /// Loads the runner, applies the redelivery and supersession guards,
    /// runs the driver call under its budget and the release lock, and
    /// classifies the result.
    #[tracing::instrument(
        skip(self, request, shutdown),
        fields(wfr_id = request.wfr_id, pipeline_id = request.pipeline_id),
        target = TRACING_TARGET
    )]
    pub async fn process_deploy_request(
        &self,
        request: &DeployRequest,
        shutdown: &CancellationToken,
    ) -> Result<TriggerOutcome> {
        let mut conn = self.state.connection().await?;

        let Some(runner) = conn.find_cd_workflow_runner_by_id(request.wfr_id).await? else {
            return Err(EngineError::validation(format!(
                "unknown workflow runner {}",
                request.wfr_id
            )));
        };
        if runner.is_terminal() {
            tracing::debug!(
                target: TRACING_TARGET,
                status = %runner.status,
                "Skipping redelivery for finished runner"
            );
            return Ok(TriggerOutcome::AlreadyFinished);
        }

        let Some(pipeline) = conn.find_pipeline_by_id(request.pipeline_id).await? else {
            return Err(EngineError::validation(format!(
                "unknown pipeline {}",
                request.pipeline_id
            )));
        };

        // A request that is no longer the newest for its release fails
        // without a driver call.
        if !conn
            .is_latest_runner(runner.id, pipeline.id, WorkflowType::Deploy)
            .await?
        {
            fail_deployment(
                &self.state.config,
                &mut conn,
                &runner,
                &pipeline,
                SUPERSEDED_MESSAGE,
                true,
            )
            .await?;
            return Ok(TriggerOutcome::Superseded);
        }

        conn.update_cd_workflow_status(runner.cd_workflow_id, CdWorkflowStatus::Started)
            .await?;

        let cancel = shutdown.child_token();
        let release_lock =
            self.contexts
                .begin(pipeline.id, pipeline.environment_id, runner.id, cancel.clone());
        let guard = release_lock.lock().await;

        let outcome = self
            .execute_deploy(&mut conn, request, &pipeline, &runner, &cancel, shutdown)
            .await;

        drop(guard);
        self.contexts
            .finish(pipeline.id, pipeline.environment_id, runner.id);

        outcome
    }

    async fn execute_deploy(
        &self,
        conn: &mut PgConn,
        request: &DeployRequest,
        pipeline: &Pipeline,
        runner: &CdWorkflowRunner,
        cancel: &CancellationToken,
        shutdown: &CancellationToken,
    ) -> Result<TriggerOutcome> {
        // Re-check after waiting for the release lock; the previous
        // holder may have settled this runner.
        let Some(current) = conn.find_cd_workflow_runner_by_id(runner.id).await? else {
            return Err(EngineError::validation(format!(
                "unknown workflow runner {}",
                runner.id
            )));
        };
        if current.is_terminal() {
            return Ok(TriggerOutcome::AlreadyFinished);
        }

        let artifact = load_artifact(conn, request.ci_artifact_id).await?;

        // Helm runners surface progress through the runner row itself;
        // gitops runners surface it through the timeline.
        if pipeline.is_helm() && current.status.is_queued() {
            conn.update_nonterminal_status(runner.id, WorkflowRunnerStatus::Starting)
                .await?;
        }

        let mut install = InstallRequest::new(AppIdentifier::from_pipeline(pipeline), &artifact.image);
        if let Some(digest) = artifact.image_digest.clone() {
            install = install.with_image_digest(digest);
        }

        let budget = self
            .state
            .config
            .install_timeout_for(pipeline.deployment_app_type);
        let call = bounded_install(
            &self.state.drivers,
            pipeline.deployment_app_type,
            &install,
            budget,
            cancel,
        )
        .await;

        match call {
            InstallCall::Completed(result) => {
                self.complete_deploy(conn, request, pipeline, runner, result)
                    .await
            }
            InstallCall::Deadline => self.handle_deadline(conn, pipeline, runner).await,
            InstallCall::Cancelled => {
                if shutdown.is_cancelled() {
                    // No state change; the message redelivers after
                    // restart.
                    tracing::info!(target: TRACING_TARGET, "Deploy call interrupted by shutdown");
                    Ok(TriggerOutcome::Shutdown)
                } else {
                    fail_deployment(
                        &self.state.config,
                        conn,
                        runner,
                        pipeline,
                        SUPERSEDED_MESSAGE,
                        true,
                    )
                    .await?;
                    Ok(TriggerOutcome::Superseded)
                }
            }
            InstallCall::Failed(err) => {
                fail_deployment(
                    &self.state.config,
                    conn,
                    runner,
                    pipeline,
                    &err.to_string(),
                    false,
                )
                .await?;
                Ok(TriggerOutcome::Failed(err))
            }
        }
    }

    async fn complete_deploy(
        &self,
        conn: &mut PgConn,
        request: &DeployRequest,
        pipeline: &Pipeline,
        runner: &CdWorkflowRunner,
        result: InstallResult,
    ) -> Result<TriggerOutcome> {
        conn.supersede_previous_runners(pipeline.id, runner.id, SUPERSEDED_MESSAGE)
            .await?;

        if !pipeline.is_helm() {
            conn.save_timeline_if_not_already_present(NewPipelineStatusTimeline::for_runner(
                runner.id,
                TimelineStatus::GitCommit,
            ))
            .await?;

            if request.force_sync {
                self.request_immediate_sync(conn, pipeline, runner).await;
            }
        }

        tracing::info!(
            target: TRACING_TARGET,
            release = %result.release_name,
            revision = result.revision.as_deref().unwrap_or_default(),
            "Deploy request accepted by driver"
        );
        Ok(TriggerOutcome::Completed)
    }

    /// Best-effort sync kick when the trigger asked for one. The Argo
    /// sweep handles the rest.
    async fn request_immediate_sync(
        &self,
        conn: &mut PgConn,
        pipeline: &Pipeline,
        runner: &CdWorkflowRunner,
    ) {
        let app = AppIdentifier::from_pipeline(pipeline);
        match self
            .state
            .drivers
            .sync(pipeline.deployment_app_type, &app)
            .await
        {
            Ok(sync) if sync.triggered => {
                let timeline = NewPipelineStatusTimeline::for_runner(
                    runner.id,
                    TimelineStatus::ArgocdSyncInitiated,
                );
                if let Err(err) = conn.save_timeline_if_not_already_present(timeline).await {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        error = %err,
                        "Failed to record sync initiation"
                    );
                }
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    error = %err,
                    "Immediate sync request failed"
                );
            }
        }
    }

    async fn handle_deadline(
        &self,
        conn: &mut PgConn,
        pipeline: &Pipeline,
        runner: &CdWorkflowRunner,
    ) -> Result<TriggerOutcome> {
        let mins = self
            .state
            .config
            .install_timeout_mins_for(pipeline.deployment_app_type);
        let message = timeout_message(&pipeline.deployment_app_name, mins);

        if pipeline.is_helm() {
            // One status probe decides: a release that landed anyway
            // stays non-terminal for the reconciler to settle.
            let app = AppIdentifier::from_pipeline(pipeline);
            match self.state.drivers.status(DeploymentAppType::Helm, &app).await {
                Ok(status) if status.is_deployed_and_healthy() => {
                    tracing::info!(
                        target: TRACING_TARGET,
                        "Release settled after budget; leaving runner to the reconciler"
                    );
                    return Ok(TriggerOutcome::Deadline);
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        error = %err,
                        "Release probe after timeout failed"
                    );
                }
            }
        }

        fail_deployment(&self.state.config, conn, runner, pipeline, &message, false).await?;
        Ok(TriggerOutcome::Deadline)
    }
}

/// Marks the runner failed and stamps the matching terminal timeline.
///
/// A runner that already finished is left alone; losing this race is
/// routine during supersession.
pub(crate) async fn fail_deployment(
    config: &EngineConfig,
    conn: &mut PgConn,
    runner: &CdWorkflowRunner,
    pipeline: &Pipeline,
    reason: &str,
    superseded: bool,
) -> Result<()> {
    match conn
        .update_runner_status(
            runner.id,
            WorkflowRunnerStatus::Failed,
            Some(reason.to_owned()),
        )
        .await
    {
        Ok(failed) => {
            if superseded {
                conn.mark_timeline_superseded(runner.id).await?;
            } else {
                let detail = truncate_detail(&format!("Deployment failed: {reason}"));
                conn.mark_timeline_failed(runner.id, &detail).await?;
            }
            if config.expose_cd_metrics {
                metrics::deployment_finished(pipeline, failed.status, failed.duration_seconds());
            }
            tracing::info!(
                target: TRACING_TARGET,
                runner_id = runner.id,
                reason,
                "Deployment marked failed"
            );
        }
        Err(PgError::TerminalTransition { current, .. }) => {
            tracing::warn!(
                target: TRACING_TARGET,
                runner_id = runner.id,
                current = %current,
                "Skipping failure mark for finished runner"
            );
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

/// How a bounded driver install call ended.
#[derive(Debug)]
pub(crate) enum InstallCall {
    /// The driver accepted the request.
    Completed(InstallResult),
    /// The budget elapsed, or the driver timed out on its side.
    Deadline,
    /// The cancellation token fired mid-call.
    Cancelled,
    /// The driver reported an error.
    Failed(DriverError),
}

/// Runs the install call under its time budget and cancellation token.
pub(crate) async fn bounded_install(
    drivers: &DriverRegistry,
    app_type: DeploymentAppType,
    request: &InstallRequest,
    budget: Duration,
    cancel: &CancellationToken,
) -> InstallCall {
    tokio::select! {
        biased;
        () = cancel.cancelled() => InstallCall::Cancelled,
        result = tokio::time::timeout(budget, drivers.install(app_type, request)) => match result {
            Ok(Ok(accepted)) => InstallCall::Completed(accepted),
            Ok(Err(err)) if err.is_timeout() => InstallCall::Deadline,
            Ok(Err(err)) => InstallCall::Failed(err),
            Err(_) => InstallCall::Deadline,
        },
    }
}

/// Failure message for a deploy call that ran out its budget.
fn timeout_message(release_name: &str, mins: i64) -> String {
    format!("Deployment timeout: release {release_name} took more than {mins} mins")
}

/// Truncates a detail message to the timeline column limit on a char
/// boundary.
pub(crate) fn truncate_detail(detail: &str) -> String {
    if detail.len() <= timeline::MAX_STATUS_DETAIL_LENGTH {
        detail.to_owned()
    } else {
        detail
            .chars()
            .take(timeline::MAX_STATUS_DETAIL_LENGTH)
            .collect()
    }
}

pub(crate) async fn load_pipeline(conn: &mut PgConn, pipeline_id: i64) -> Result<Pipeline> {
    let Some(pipeline) = conn.find_pipeline_by_id(pipeline_id).await? else {
        return Err(EngineError::validation(format!(
            "unknown pipeline {pipeline_id}"
        )));
    };
    Ok(pipeline)
}

pub(crate) async fn load_artifact(conn: &mut PgConn, artifact_id: i64) -> Result<CiArtifact> {
    let Some(artifact) = conn.find_ci_artifact_by_id(artifact_id).await? else {
        return Err(EngineError::validation(format!(
            "unknown artifact {artifact_id}"
        )));
    };
    Ok(artifact)
}

pub(crate) async fn resolve_workflow(
    conn: &mut PgConn,
    pipeline: &Pipeline,
    request: &StageTriggerRequest,
) -> Result<CdWorkflow> {
    if let Some(workflow_id) = request.cd_workflow_id {
        if let Some(workflow) = conn.find_cd_workflow_by_id(workflow_id).await? {
            if workflow.ci_artifact_id == request.ci_artifact_id {
                return Ok(workflow);
            }
        }
    }

    let workflow = conn
        .create_cd_workflow(NewCdWorkflow {
            pipeline_id: pipeline.id,
            ci_artifact_id: request.ci_artifact_id,
            workflow_status: Some(CdWorkflowStatus::RequestAccepted),
        })
        .await?;
    Ok(workflow)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use conveyor_drivers::{
        AppStatus, DriverResult, HealthStatus, ReleaseDriver, ReleaseStatus, SyncResult,
    };

    use super::*;

    #[derive(Clone, Copy)]
    enum Script {
        Accept,
        Reject,
        Hang,
        TimeOut,
    }

    struct ScriptedDriver(Script);

    #[async_trait]
    impl ReleaseDriver for ScriptedDriver {
        fn driver_name(&self) -> &'static str {
            "scripted"
        }

        async fn status(&self, _app: &AppIdentifier) -> DriverResult<AppStatus> {
            Ok(AppStatus {
                health: HealthStatus::Healthy,
                release_status: ReleaseStatus::Deployed,
                sync_status: None,
                operation_phase: None,
                synced_revision: None,
                last_deployed_at: None,
                description: None,
            })
        }

        async fn sync(&self, _app: &AppIdentifier) -> DriverResult<SyncResult> {
            Ok(SyncResult::triggered(None))
        }

        async fn install(&self, request: &InstallRequest) -> DriverResult<InstallResult> {
            match self.0 {
                Script::Accept => Ok(InstallResult {
                    release_name: request.app.release_name.clone(),
                    revision: Some("5e66fa1".to_owned()),
                    message: None,
                }),
                Script::Reject => Err(DriverError::reported_failure("values rejected")),
                Script::Hang => std::future::pending().await,
                Script::TimeOut => Err(DriverError::timeout("upstream deadline")),
            }
        }
    }

    fn registry(script: Script) -> DriverRegistry {
        DriverRegistry::from_drivers(
            Box::new(ScriptedDriver(script)),
            Box::new(ScriptedDriver(script)),
            Box::new(ScriptedDriver(script)),
        )
    }

    fn install_request() -> InstallRequest {
        InstallRequest::new(
            AppIdentifier::new(7, 3, "orders-prod", "prod"),
            "registry.local/orders:42",
        )
    }

    #[tokio::test]
    async fn accepted_install_completes() {
        let registry = registry(Script::Accept);
        let call = bounded_install(
            &registry,
            DeploymentAppType::Helm,
            &install_request(),
            Duration::from_secs(60),
            &CancellationToken::new(),
        )
        .await;

        match call {
            InstallCall::Completed(result) => assert_eq!(result.release_name, "orders-prod"),
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hung_install_hits_deadline() {
        let registry = registry(Script::Hang);
        let call = bounded_install(
            &registry,
            DeploymentAppType::Helm,
            &install_request(),
            Duration::from_secs(360),
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(call, InstallCall::Deadline));
    }

    #[tokio::test]
    async fn driver_side_timeout_counts_as_deadline() {
        let registry = registry(Script::TimeOut);
        let call = bounded_install(
            &registry,
            DeploymentAppType::Gitops,
            &install_request(),
            Duration::from_secs(60),
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(call, InstallCall::Deadline));
    }

    #[tokio::test]
    async fn rejected_install_fails() {
        let registry = registry(Script::Reject);
        let call = bounded_install(
            &registry,
            DeploymentAppType::Helm,
            &install_request(),
            Duration::from_secs(60),
            &CancellationToken::new(),
        )
        .await;

        match call {
            InstallCall::Failed(err) => assert!(!err.is_transient()),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancelled_token_wins_over_call() {
        let registry = registry(Script::Hang);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let call = bounded_install(
            &registry,
            DeploymentAppType::Gitops,
            &install_request(),
            Duration::from_secs(60),
            &cancel,
        )
        .await;

        assert!(matches!(call, InstallCall::Cancelled));
    }

    #[test]
    fn timeout_message_names_release_and_budget() {
        let message = timeout_message("orders-prod", 6);
        assert_eq!(
            message,
            "Deployment timeout: release orders-prod took more than 6 mins"
        );
    }

    #[test]
    fn detail_truncation_is_char_safe() {
        let short = "Deployment failed: values rejected";
        assert_eq!(truncate_detail(short), short);

        let long = "x".repeat(400);
        assert_eq!(truncate_detail(&long).chars().count(), 250);

        let accented = "é".repeat(300);
        let truncated = truncate_detail(&accented);
        assert_eq!(truncated.chars().count(), 250);
        assert!(truncated.chars().all(|c| c == 'é'));
    }

    #[test]
    fn outcome_labels_are_stable() {
        assert_eq!(TriggerOutcome::Completed.as_str(), "completed");
        assert_eq!(TriggerOutcome::Superseded.as_str(), "superseded");
        assert_eq!(TriggerOutcome::Shutdown.as_str(), "shutdown");
        assert_eq!(
            TriggerOutcome::Failed(DriverError::reported_failure("oom")).as_str(),
            "failed"
        );
    }

    #[test]
    fn superseded_message_names_the_newer_deployment() {
        assert_eq!(
            SUPERSEDED_MESSAGE,
            "This deployment is superseded by a newer deployment."
        );
    }
}
