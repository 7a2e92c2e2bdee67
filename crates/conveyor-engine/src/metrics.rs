//! Deployment metrics recorded by the engine.
//!
//! Recording is cheap and unconditional at this layer; callers gate on
//! the `expose_cd_metrics` switch so a disabled exporter costs nothing.

use conveyor_postgres::model::Pipeline;
use conveyor_postgres::types::WorkflowRunnerStatus;
use metrics::{counter, histogram};

/// Record a deploy runner reaching a terminal status.
pub fn deployment_finished(
    pipeline: &Pipeline,
    status: WorkflowRunnerStatus,
    duration_secs: Option<f64>,
) {
    counter!(
        "conveyor_cd_deployments_total",
        "app" => pipeline.app_id.to_string(),
        "environment" => pipeline.environment_name.clone(),
        "deployment_type" => pipeline.deployment_app_type.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);

    if let Some(duration_secs) = duration_secs {
        histogram!(
            "conveyor_cd_deployment_duration_seconds",
            "deployment_type" => pipeline.deployment_app_type.to_string(),
        )
        .record(duration_secs);
    }
}

/// Record the classified outcome of one deploy request.
pub fn trigger_outcome(outcome: &str) {
    counter!("conveyor_cd_trigger_outcomes_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record a completed reconciliation sweep.
pub fn sweep_completed(sweep: &str, processed: usize) {
    counter!("conveyor_cd_sweeps_total", "sweep" => sweep.to_string()).increment(1);
    counter!("conveyor_cd_sweep_runners_total", "sweep" => sweep.to_string())
        .increment(processed as u64);
}
