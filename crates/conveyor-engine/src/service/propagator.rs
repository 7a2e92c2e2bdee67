//! Propagation of stage and build completions through the pipeline DAG.

use std::future::Future;

use async_trait::async_trait;
use conveyor_postgres::model::{CdWorkflow, CdWorkflowRunner, Pipeline};
use conveyor_postgres::query::{
    CdWorkflowRepository, CdWorkflowRunnerRepository, CiArtifactRepository, PipelineRepository,
};
use conveyor_postgres::types::constants::workflow::SYSTEM_USER_ID;
use conveyor_postgres::types::ArtifactDataSource;
use conveyor_postgres::PgConn;

use crate::service::trigger::{load_pipeline, StageTriggerRequest, TriggerService};
use crate::service::EngineState;
use crate::{EngineError, Result};

const TRACING_TARGET: &str = "conveyor_engine::propagator";

/// Fan-out of completions into follow-up triggers.
///
/// Success handlers are invoked for runners that already reached their
/// terminal status, which makes each propagation fire at most once per
/// completion: the status store admits exactly one terminal transition
/// per runner.
#[async_trait]
pub trait Propagator: Send + Sync {
    /// Runs the follow-ups of a succeeded deploy stage: the automatic
    /// post stage when one is configured, otherwise the chained
    /// pipelines.
    async fn handle_deployment_success(&self, runner_id: i64) -> Result<()>;

    /// Triggers the deployment a succeeded pre stage was gating.
    async fn handle_pre_stage_success(&self, runner_id: i64) -> Result<()>;

    /// Triggers the pipelines chained after a succeeded post stage.
    async fn handle_post_stage_success(&self, runner_id: i64) -> Result<()>;

    /// Fans a fresh build artifact out to the pipelines it feeds.
    async fn handle_ci_success(
        &self,
        ci_pipeline_id: i64,
        ci_artifact_id: i64,
        user_id: i64,
    ) -> Result<()>;
}

/// [`Propagator`] walking the stored pipeline DAG.
#[derive(Clone)]
pub struct DagPropagator {
    state: EngineState,
    trigger: TriggerService,
}

impl DagPropagator {
    /// Creates the propagator.
    pub fn new(state: EngineState, trigger: TriggerService) -> Self {
        Self { state, trigger }
    }

    async fn load_completed_stage(
        &self,
        conn: &mut PgConn,
        runner_id: i64,
    ) -> Result<(CdWorkflowRunner, CdWorkflow, Pipeline)> {
        let Some(runner) = conn.find_cd_workflow_runner_by_id(runner_id).await? else {
            return Err(EngineError::validation(format!(
                "unknown workflow runner {runner_id}"
            )));
        };
        let Some(workflow) = conn.find_cd_workflow_by_id(runner.cd_workflow_id).await? else {
            return Err(EngineError::validation(format!(
                "unknown workflow {}",
                runner.cd_workflow_id
            )));
        };
        let pipeline = load_pipeline(conn, workflow.pipeline_id).await?;
        Ok((runner, workflow, pipeline))
    }

    /// Artifact a chained pipeline deploys: the hook-produced derivative
    /// when one exists, otherwise the artifact that flowed in.
    async fn resolve_outgoing_artifact(
        &self,
        conn: &mut PgConn,
        producer_pipeline_id: i64,
        incoming_artifact_id: i64,
    ) -> Result<i64> {
        for source in [ArtifactDataSource::PostCd, ArtifactDataSource::PreCd] {
            let derived = conn
                .find_derived_artifact(producer_pipeline_id, incoming_artifact_id, source)
                .await?;
            if let Some(artifact) = derived {
                return Ok(artifact.id);
            }
        }
        Ok(incoming_artifact_id)
    }

    async fn trigger_chained_pipelines(
        &self,
        conn: &mut PgConn,
        parent: &Pipeline,
        incoming_artifact_id: i64,
    ) -> Result<()> {
        let children = conn.find_child_pipelines(parent.id).await?;
        if children.is_empty() {
            return Ok(());
        }

        let artifact_id = self
            .resolve_outgoing_artifact(conn, parent.id, incoming_artifact_id)
            .await?;

        for child in children {
            let request = StageTriggerRequest::new(child.id, artifact_id, SYSTEM_USER_ID);
            if let Err(err) = self.route_trigger(&child, request).await {
                tracing::error!(
                    target: TRACING_TARGET,
                    pipeline_id = child.id,
                    error = %err,
                    "Chained pipeline trigger failed"
                );
            }
        }
        Ok(())
    }

    async fn route_trigger(&self, pipeline: &Pipeline, request: StageTriggerRequest) -> Result<()> {
        match route_for(pipeline) {
            ChildRoute::PreStage => {
                self.trigger.trigger_pre_stage(request).await?;
            }
            ChildRoute::Deploy => {
                self.trigger.trigger_automatic_deployment(request).await?;
            }
            ChildRoute::Manual => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    pipeline_id = pipeline.id,
                    "Pipeline awaits a manual trigger"
                );
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Propagator for DagPropagator {
    #[tracing::instrument(skip(self), target = TRACING_TARGET)]
    async fn handle_deployment_success(&self, runner_id: i64) -> Result<()> {
        let mut conn = self.state.connection().await?;
        let (_, workflow, pipeline) = self.load_completed_stage(&mut conn, runner_id).await?;

        if pipeline.has_post_stage() {
            if pipeline.post_stage_automatic() {
                let request =
                    StageTriggerRequest::new(pipeline.id, workflow.ci_artifact_id, SYSTEM_USER_ID)
                        .with_workflow(workflow.id);
                self.trigger.trigger_post_stage(request).await?;
            } else {
                tracing::debug!(
                    target: TRACING_TARGET,
                    pipeline_id = pipeline.id,
                    "Post stage awaits a manual trigger"
                );
            }
            return Ok(());
        }

        self.trigger_chained_pipelines(&mut conn, &pipeline, workflow.ci_artifact_id)
            .await
    }

    #[tracing::instrument(skip(self), target = TRACING_TARGET)]
    async fn handle_pre_stage_success(&self, runner_id: i64) -> Result<()> {
        let mut conn = self.state.connection().await?;
        let (runner, workflow, pipeline) = self.load_completed_stage(&mut conn, runner_id).await?;

        // Plugin steps in the hook may have derived a new artifact; the
        // deployment uses it over the one that entered the stage.
        let artifact_id = match conn
            .find_derived_artifact(pipeline.id, workflow.ci_artifact_id, ArtifactDataSource::PreCd)
            .await?
        {
            Some(derived) => derived.id,
            None => workflow.ci_artifact_id,
        };

        let request = StageTriggerRequest::new(pipeline.id, artifact_id, runner.triggered_by)
            .with_workflow(workflow.id);
        self.trigger.trigger_automatic_deployment(request).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), target = TRACING_TARGET)]
    async fn handle_post_stage_success(&self, runner_id: i64) -> Result<()> {
        let mut conn = self.state.connection().await?;
        let (_, workflow, pipeline) = self.load_completed_stage(&mut conn, runner_id).await?;

        self.trigger_chained_pipelines(&mut conn, &pipeline, workflow.ci_artifact_id)
            .await
    }

    #[tracing::instrument(skip(self), target = TRACING_TARGET)]
    async fn handle_ci_success(
        &self,
        ci_pipeline_id: i64,
        ci_artifact_id: i64,
        user_id: i64,
    ) -> Result<()> {
        let mut conn = self.state.connection().await?;
        let pipelines = conn.find_pipelines_by_ci_pipeline(ci_pipeline_id).await?;
        drop(conn);

        if pipelines.is_empty() {
            tracing::debug!(target: TRACING_TARGET, "No pipelines consume this build");
            return Ok(());
        }

        // Large fan-outs go in bounded batches so one build completion
        // cannot flood the trigger path.
        let batch_size = self.state.config.fan_out_batch_size();
        for_each_batch(pipelines, batch_size, |pipeline| async move {
            let request = StageTriggerRequest::new(pipeline.id, ci_artifact_id, user_id);
            if let Err(err) = self.route_trigger(&pipeline, request).await {
                tracing::error!(
                    target: TRACING_TARGET,
                    pipeline_id = pipeline.id,
                    error = %err,
                    "Build fan-out trigger failed"
                );
            }
        })
        .await;
        Ok(())
    }
}

/// Which trigger a pipeline receives when its upstream completes.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ChildRoute {
    /// The automatic pre stage gates the deployment.
    PreStage,
    /// No pre stage; the deployment fires directly.
    Deploy,
    /// Something on the path is manual; nothing fires.
    Manual,
}

pub(crate) fn route_for(pipeline: &Pipeline) -> ChildRoute {
    if pipeline.has_pre_stage() {
        if pipeline.pre_stage_automatic() {
            ChildRoute::PreStage
        } else {
            ChildRoute::Manual
        }
    } else if pipeline.is_automatic() {
        ChildRoute::Deploy
    } else {
        ChildRoute::Manual
    }
}

/// Runs `handle` over `items` in batches of `batch_size`, finishing each
/// batch before the next one starts.
pub(crate) async fn for_each_batch<T, F, Fut>(items: Vec<T>, batch_size: usize, handle: F)
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = ()>,
{
    let batch_size = batch_size.max(1);
    let mut remaining = items;
    while !remaining.is_empty() {
        let rest = remaining.split_off(batch_size.min(remaining.len()));
        let batch = std::mem::replace(&mut remaining, rest);
        futures::future::join_all(batch.into_iter().map(&handle)).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use conveyor_postgres::types::{DeploymentAppType, TriggerPolicy};

    use super::*;

    fn pipeline(trigger_type: TriggerPolicy) -> Pipeline {
        Pipeline {
            id: 31,
            app_id: 7,
            environment_id: 3,
            environment_name: "prod".to_owned(),
            ci_pipeline_id: Some(11),
            parent_pipeline_id: None,
            pipeline_name: "orders-prod".to_owned(),
            deployment_app_name: "orders-prod".to_owned(),
            deployment_app_type: DeploymentAppType::Gitops,
            trigger_type,
            pre_stage_config: None,
            post_stage_config: None,
            pre_trigger_type: TriggerPolicy::Automatic,
            post_trigger_type: TriggerPolicy::Automatic,
            run_pre_stage_in_env: false,
            run_post_stage_in_env: false,
            deployment_app_created: true,
            deleted: false,
            created_on: jiff::Timestamp::now().into(),
            updated_on: jiff::Timestamp::now().into(),
        }
    }

    #[test]
    fn automatic_pipeline_without_pre_stage_deploys() {
        assert_eq!(route_for(&pipeline(TriggerPolicy::Automatic)), ChildRoute::Deploy);
    }

    #[test]
    fn manual_pipeline_waits() {
        assert_eq!(route_for(&pipeline(TriggerPolicy::Manual)), ChildRoute::Manual);
    }

    #[test]
    fn automatic_pre_stage_gates_the_deployment() {
        let mut with_pre = pipeline(TriggerPolicy::Automatic);
        with_pre.pre_stage_config = Some("steps: [lint-manifests]".to_owned());
        assert_eq!(route_for(&with_pre), ChildRoute::PreStage);
    }

    #[test]
    fn manual_pre_stage_stops_the_chain() {
        let mut with_pre = pipeline(TriggerPolicy::Automatic);
        with_pre.pre_stage_config = Some("steps: [lint-manifests]".to_owned());
        with_pre.pre_trigger_type = TriggerPolicy::Manual;
        assert_eq!(route_for(&with_pre), ChildRoute::Manual);
    }

    #[test]
    fn empty_pre_stage_config_counts_as_no_stage() {
        let mut with_empty = pipeline(TriggerPolicy::Automatic);
        with_empty.pre_stage_config = Some(String::new());
        assert_eq!(route_for(&with_empty), ChildRoute::Deploy);
    }

    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    enum Event {
        Started(usize),
        Finished(usize),
    }

    #[tokio::test]
    async fn batches_complete_before_the_next_starts() {
        let events: Arc<Mutex<Vec<Event>>> = Arc::new(Mutex::new(Vec::new()));

        let recorder = events.clone();
        for_each_batch((0..7).collect(), 3, |item| {
            let recorder = recorder.clone();
            async move {
                recorder.lock().unwrap().push(Event::Started(item));
                tokio::task::yield_now().await;
                recorder.lock().unwrap().push(Event::Finished(item));
            }
        })
        .await;

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 14);

        // Items 0..3 form the first batch, 3..6 the second, 6 the last.
        // Every first-batch item must finish before any second-batch
        // item starts, and so on.
        let position = |event: Event| events.iter().position(|&e| e == event).unwrap();
        for earlier in 0..3 {
            for later in 3..6 {
                assert!(position(Event::Finished(earlier)) < position(Event::Started(later)));
            }
        }
        for earlier in 3..6 {
            assert!(position(Event::Finished(earlier)) < position(Event::Started(6)));
        }
    }

    #[tokio::test]
    async fn zero_batch_size_still_makes_progress() {
        let seen: Arc<Mutex<Vec<i32>>> = Arc::new(Mutex::new(Vec::new()));

        let recorder = seen.clone();
        for_each_batch(vec![1, 2, 3], 0, |item| {
            let recorder = recorder.clone();
            async move {
                recorder.lock().unwrap().push(item);
            }
        })
        .await;

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }
}
