//! Database enumeration types for type-safe queries.
//!
//! This module provides strongly-typed enumerations that correspond to PostgreSQL ENUM types
//! defined in the database schema. Each enumeration provides serialization support for APIs
//! and database integration through Diesel.

// Workflow-related enumerations
pub mod cd_workflow_status;
pub mod workflow_executor_type;
pub mod workflow_runner_status;
pub mod workflow_type;

// Pipeline-related enumerations
pub mod deployment_app_type;
pub mod trigger_policy;

// Status-tracking enumerations
pub mod artifact_data_source;
pub mod timeline_status;

pub use artifact_data_source::ArtifactDataSource;
pub use cd_workflow_status::CdWorkflowStatus;
pub use deployment_app_type::DeploymentAppType;
pub use timeline_status::TimelineStatus;
pub use trigger_policy::TriggerPolicy;
pub use workflow_executor_type::WorkflowExecutorType;
pub use workflow_runner_status::WorkflowRunnerStatus;
pub use workflow_type::WorkflowType;
