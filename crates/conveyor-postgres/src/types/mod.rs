//! Contains constraints, enumerations and other custom types.

pub mod constants;
mod constraint;
mod enums;
mod pagination;

pub use constraint::{
    AppConstraints, CdWorkflowStatusLatestConstraints, CiWorkflowStatusLatestConstraints,
    ConstraintCategory, ConstraintViolation, DeploymentAppStatusConstraints,
    PipelineStatusSyncDetailConstraints, PipelineStatusTimelineConstraints,
};
pub use enums::{
    ArtifactDataSource, CdWorkflowStatus, DeploymentAppType, TimelineStatus, TriggerPolicy,
    WorkflowExecutorType, WorkflowRunnerStatus, WorkflowType,
};
pub use pagination::{OffsetPage, OffsetPagination};
