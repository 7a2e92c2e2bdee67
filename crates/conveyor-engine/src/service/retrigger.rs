//! Bounded automatic retries for failed hook stages.

use conveyor_postgres::model::CdWorkflowRunner;
use conveyor_postgres::query::{CdWorkflowRepository, CdWorkflowRunnerRepository};
use conveyor_postgres::types::constants::workflow::SYSTEM_USER_ID;
use conveyor_postgres::types::{WorkflowRunnerStatus, WorkflowType};

use crate::service::trigger::{load_pipeline, StageTriggerRequest, TriggerService};
use crate::service::EngineState;
use crate::{EngineError, Result};

const TRACING_TARGET: &str = "conveyor_engine::retrigger";

/// What the controller decided for one failed runner.
#[derive(Debug)]
pub enum RetriggerOutcome {
    /// A fresh attempt was created.
    Scheduled(CdWorkflowRunner),
    /// Automatic retries are switched off.
    Disabled,
    /// The runner is not a retryable hook-stage failure.
    NotEligible,
    /// The retry budget for this attempt chain is spent.
    LimitReached {
        /// Retries already charged against the original attempt.
        attempts: i64,
    },
}

/// Re-runs failed pre and post stages within a per-attempt budget.
///
/// Every retry points back at the original attempt, so the budget holds
/// across chained retries instead of resetting on each new runner.
#[derive(Clone)]
pub struct RetriggerService {
    state: EngineState,
    trigger: TriggerService,
}

impl RetriggerService {
    /// Creates the controller.
    pub fn new(state: EngineState, trigger: TriggerService) -> Self {
        Self { state, trigger }
    }

    /// Decides and, when allowed, schedules the retry of a failed hook
    /// stage runner.
    #[tracing::instrument(skip(self, runner), fields(runner_id = runner.id), target = TRACING_TARGET)]
    pub async fn handle_cd_stage_retrigger(
        &self,
        runner: &CdWorkflowRunner,
    ) -> Result<RetriggerOutcome> {
        match retry_gate(self.state.config.workflow_retries_enabled, runner) {
            RetryGate::Allowed => {}
            RetryGate::Disabled => return Ok(RetriggerOutcome::Disabled),
            RetryGate::NotHookStage | RetryGate::NotRetryableStatus => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    workflow_type = %runner.workflow_type,
                    status = %runner.status,
                    "Runner is not eligible for automatic retry"
                );
                return Ok(RetriggerOutcome::NotEligible);
            }
        }

        let mut conn = self.state.connection().await?;

        let root_runner_id = runner.retry_root_id();
        let attempts = conn.count_runner_retries(root_runner_id).await?;
        if attempts >= self.state.config.max_cd_workflow_runner_retries {
            tracing::warn!(
                target: TRACING_TARGET,
                root_runner_id,
                attempts,
                "Retry budget exhausted"
            );
            return Ok(RetriggerOutcome::LimitReached { attempts });
        }

        let Some(workflow) = conn.find_cd_workflow_by_id(runner.cd_workflow_id).await? else {
            return Err(EngineError::validation(format!(
                "unknown workflow {}",
                runner.cd_workflow_id
            )));
        };
        let pipeline = load_pipeline(&mut conn, workflow.pipeline_id).await?;
        drop(conn);

        let request =
            StageTriggerRequest::new(pipeline.id, workflow.ci_artifact_id, SYSTEM_USER_ID)
                .with_workflow(workflow.id)
                .with_ref_runner(root_runner_id);
        let retried = match runner.workflow_type {
            WorkflowType::Pre => self.trigger.trigger_pre_stage(request).await?,
            WorkflowType::Post => self.trigger.trigger_post_stage(request).await?,
            WorkflowType::Deploy => return Ok(RetriggerOutcome::NotEligible),
        };

        tracing::info!(
            target: TRACING_TARGET,
            retried_runner_id = retried.id,
            root_runner_id,
            attempt = attempts + 1,
            "Scheduled hook stage retry"
        );
        Ok(RetriggerOutcome::Scheduled(retried))
    }
}

/// Pure eligibility gate for automatic retries.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum RetryGate {
    Allowed,
    Disabled,
    NotHookStage,
    NotRetryableStatus,
}

pub(crate) fn retry_gate(retries_enabled: bool, runner: &CdWorkflowRunner) -> RetryGate {
    if !retries_enabled {
        return RetryGate::Disabled;
    }
    if !runner.is_hook_stage() {
        return RetryGate::NotHookStage;
    }
    if !matches!(
        runner.status,
        WorkflowRunnerStatus::Failed | WorkflowRunnerStatus::TimedOut
    ) {
        return RetryGate::NotRetryableStatus;
    }
    RetryGate::Allowed
}

#[cfg(test)]
mod tests {
    use conveyor_postgres::types::WorkflowExecutorType;

    use super::*;

    fn runner(workflow_type: WorkflowType, status: WorkflowRunnerStatus) -> CdWorkflowRunner {
        CdWorkflowRunner {
            id: 88,
            cd_workflow_id: 40,
            workflow_type,
            executor_type: WorkflowExecutorType::ArgoWorkflow,
            status,
            message: None,
            started_on: jiff::Timestamp::now().into(),
            finished_on: Some(jiff::Timestamp::now().into()),
            triggered_by: 5,
            ref_cd_workflow_runner_id: None,
            image_path_reservation_ids: Vec::new(),
            reference_id: None,
            namespace: None,
            log_location: None,
            created_on: jiff::Timestamp::now().into(),
            updated_on: jiff::Timestamp::now().into(),
        }
    }

    #[test]
    fn disabled_retries_stop_everything() {
        let failed = runner(WorkflowType::Pre, WorkflowRunnerStatus::Failed);
        assert_eq!(retry_gate(false, &failed), RetryGate::Disabled);
    }

    #[test]
    fn deploy_stages_are_never_retried() {
        let failed = runner(WorkflowType::Deploy, WorkflowRunnerStatus::Failed);
        assert_eq!(retry_gate(true, &failed), RetryGate::NotHookStage);
    }

    #[test]
    fn failed_and_timed_out_hook_stages_are_retryable() {
        for status in [WorkflowRunnerStatus::Failed, WorkflowRunnerStatus::TimedOut] {
            for stage in [WorkflowType::Pre, WorkflowType::Post] {
                assert_eq!(retry_gate(true, &runner(stage, status)), RetryGate::Allowed);
            }
        }
    }

    #[test]
    fn settled_or_cancelled_runners_are_not_retried() {
        for status in [
            WorkflowRunnerStatus::Succeeded,
            WorkflowRunnerStatus::Cancelled,
            WorkflowRunnerStatus::Running,
        ] {
            assert_eq!(
                retry_gate(true, &runner(WorkflowType::Post, status)),
                RetryGate::NotRetryableStatus
            );
        }
    }

    #[test]
    fn retries_charge_against_the_original_attempt() {
        let mut retried = runner(WorkflowType::Pre, WorkflowRunnerStatus::Failed);
        retried.ref_cd_workflow_runner_id = Some(61);
        assert_eq!(retried.retry_root_id(), 61);

        let original = runner(WorkflowType::Pre, WorkflowRunnerStatus::Failed);
        assert_eq!(original.retry_root_id(), original.id);
    }
}
