//! Database query repositories for all entities in the system.
//!
//! This module contains repository implementations that provide high-level
//! database operations for all entities, encapsulating common patterns
//! and providing type-safe interfaces.
//!
//! # Pagination
//!
//! All queries that may return large result sets take an
//! [`OffsetPagination`] to provide consistent, bounded pagination across
//! the system.
//!
//! [`OffsetPagination`]: crate::types::OffsetPagination

// Application topology.
pub mod app;
pub mod ci_artifact;
pub mod pipeline;

// Workflow execution.
pub mod cd_workflow;
pub mod cd_workflow_runner;

// Status tracking.
pub mod deployment_app_status;
pub mod pipeline_status_sync_detail;
pub mod pipeline_status_timeline;
pub mod workflow_status_latest;

pub use app::AppRepository;
pub use cd_workflow::CdWorkflowRepository;
pub use cd_workflow_runner::CdWorkflowRunnerRepository;
pub use ci_artifact::CiArtifactRepository;
pub use deployment_app_status::DeploymentAppStatusRepository;
pub use pipeline::PipelineRepository;
pub use pipeline_status_sync_detail::PipelineStatusSyncDetailRepository;
pub use pipeline_status_timeline::PipelineStatusTimelineRepository;
pub use workflow_status_latest::WorkflowStatusLatestRepository;
