//! Database models for all entities in the system.
//!
//! This module contains Diesel model definitions for all database tables,
//! including structs for querying, inserting, and updating records.

mod app;
mod cd_workflow;
mod cd_workflow_runner;
mod cd_workflow_status_latest;
mod ci_artifact;
mod ci_workflow_status_latest;
mod deployment_app_status;
mod pipeline;
mod pipeline_status_sync_detail;
mod pipeline_status_timeline;

// Application models
pub use app::{App, NewApp, UpdateApp};
// Workflow models
pub use cd_workflow::{CdWorkflow, NewCdWorkflow, UpdateCdWorkflow};
pub use cd_workflow_runner::{CdWorkflowRunner, NewCdWorkflowRunner, UpdateCdWorkflowRunner};
pub use cd_workflow_status_latest::{CdWorkflowStatusLatest, NewCdWorkflowStatusLatest};
pub use ci_artifact::{CiArtifact, NewCiArtifact, UpdateCiArtifact};
pub use ci_workflow_status_latest::{CiWorkflowStatusLatest, NewCiWorkflowStatusLatest};
// Status-tracking models
pub use deployment_app_status::{DeploymentAppStatus, NewDeploymentAppStatus};
pub use pipeline::{NewPipeline, Pipeline, UpdatePipeline};
pub use pipeline_status_sync_detail::{NewPipelineStatusSyncDetail, PipelineStatusSyncDetail};
pub use pipeline_status_timeline::{
    NewPipelineStatusTimeline, PipelineStatusTimeline, UpdatePipelineStatusTimeline,
};
