//! Deployment pipeline model for PostgreSQL database operations.

use diesel::prelude::*;
use jiff_diesel::Timestamp;

use crate::schema::pipeline;
use crate::types::{DeploymentAppType, TriggerPolicy};

/// Deployment pipeline model binding an application to a target environment.
///
/// A pipeline owns one deploy stage and optional pre and post hook stages.
/// Its position in the application workflow graph is carried by
/// `ci_pipeline_id` (the CI pipeline feeding it) and `parent_pipeline_id`
/// (an upstream deployment pipeline it chains after).
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = pipeline)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Pipeline {
    /// Unique pipeline identifier.
    pub id: i64,
    /// Application this pipeline deploys.
    pub app_id: i64,
    /// Target environment identifier.
    pub environment_id: i64,
    /// Target environment name, denormalized for labels.
    pub environment_name: String,
    /// CI pipeline feeding this deployment, if any.
    pub ci_pipeline_id: Option<i64>,
    /// Upstream deployment pipeline this one chains after, if any.
    pub parent_pipeline_id: Option<i64>,
    /// Human-readable pipeline name.
    pub pipeline_name: String,
    /// Release name used by the deployment backend.
    pub deployment_app_name: String,
    /// Which release backend deploys this pipeline.
    pub deployment_app_type: DeploymentAppType,
    /// Trigger policy for the deploy stage.
    pub trigger_type: TriggerPolicy,
    /// Pre-deployment hook stage definition, if configured.
    pub pre_stage_config: Option<String>,
    /// Post-deployment hook stage definition, if configured.
    pub post_stage_config: Option<String>,
    /// Trigger policy for the pre hook stage.
    pub pre_trigger_type: TriggerPolicy,
    /// Trigger policy for the post hook stage.
    pub post_trigger_type: TriggerPolicy,
    /// Whether the pre stage runs in the target environment namespace.
    pub run_pre_stage_in_env: bool,
    /// Whether the post stage runs in the target environment namespace.
    pub run_post_stage_in_env: bool,
    /// Whether the backing release object has been created.
    pub deployment_app_created: bool,
    /// Soft-deletion flag.
    pub deleted: bool,
    /// When the pipeline was created.
    pub created_on: Timestamp,
    /// When the pipeline was last updated.
    pub updated_on: Timestamp,
}

/// Data for creating a new deployment pipeline.
#[derive(Debug, Default, Clone, Insertable)]
#[diesel(table_name = pipeline)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewPipeline {
    /// Application ID (required).
    pub app_id: i64,
    /// Environment ID (required).
    pub environment_id: i64,
    /// Environment name.
    pub environment_name: Option<String>,
    /// CI pipeline feeding this deployment.
    pub ci_pipeline_id: Option<i64>,
    /// Upstream deployment pipeline.
    pub parent_pipeline_id: Option<i64>,
    /// Pipeline name (required).
    pub pipeline_name: String,
    /// Release name (required).
    pub deployment_app_name: String,
    /// Release backend (required).
    pub deployment_app_type: DeploymentAppType,
    /// Deploy stage trigger policy.
    pub trigger_type: Option<TriggerPolicy>,
    /// Pre hook stage definition.
    pub pre_stage_config: Option<String>,
    /// Post hook stage definition.
    pub post_stage_config: Option<String>,
    /// Pre hook trigger policy.
    pub pre_trigger_type: Option<TriggerPolicy>,
    /// Post hook trigger policy.
    pub post_trigger_type: Option<TriggerPolicy>,
    /// Run the pre stage in the target namespace.
    pub run_pre_stage_in_env: Option<bool>,
    /// Run the post stage in the target namespace.
    pub run_post_stage_in_env: Option<bool>,
}

/// Data for updating a deployment pipeline.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = pipeline)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UpdatePipeline {
    /// Release backend.
    pub deployment_app_type: Option<DeploymentAppType>,
    /// Deploy stage trigger policy.
    pub trigger_type: Option<TriggerPolicy>,
    /// Backing release created flag.
    pub deployment_app_created: Option<bool>,
    /// Soft-deletion flag.
    pub deleted: Option<bool>,
}

impl Pipeline {
    /// Returns whether a pre hook stage is configured.
    pub fn has_pre_stage(&self) -> bool {
        self.pre_stage_config
            .as_deref()
            .is_some_and(|config| !config.is_empty())
    }

    /// Returns whether a post hook stage is configured.
    pub fn has_post_stage(&self) -> bool {
        self.post_stage_config
            .as_deref()
            .is_some_and(|config| !config.is_empty())
    }

    /// Returns whether the deploy stage fires automatically.
    pub fn is_automatic(&self) -> bool {
        self.trigger_type.is_automatic()
    }

    /// Returns whether the pre hook stage fires automatically.
    pub fn pre_stage_automatic(&self) -> bool {
        self.pre_trigger_type.is_automatic()
    }

    /// Returns whether the post hook stage fires automatically.
    pub fn post_stage_automatic(&self) -> bool {
        self.post_trigger_type.is_automatic()
    }

    /// Returns whether this pipeline deploys through the GitOps controller.
    pub fn is_gitops(&self) -> bool {
        self.deployment_app_type.is_gitops()
    }

    /// Returns whether this pipeline deploys as a plain Helm release.
    pub fn is_helm(&self) -> bool {
        self.deployment_app_type.is_helm()
    }

    /// Returns whether this pipeline deploys through Flux.
    pub fn is_flux(&self) -> bool {
        self.deployment_app_type.is_flux()
    }

    /// Returns whether the pipeline has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}
