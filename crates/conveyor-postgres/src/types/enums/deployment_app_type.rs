//! Deployment app type enumeration selecting the release backend.

use diesel_derive_enum::DbEnum;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Defines which release backend deploys a pipeline.
///
/// This enumeration corresponds to the `DEPLOYMENT_APP_TYPE` PostgreSQL enum
/// and selects the release driver used for trigger and status calls.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[derive(Serialize, Deserialize, DbEnum, Display, EnumIter, EnumString)]
#[ExistingTypePath = "crate::schema::sql_types::DeploymentAppType"]
pub enum DeploymentAppType {
    /// Deployed through the GitOps controller (Argo CD).
    #[db_rename = "gitops"]
    #[serde(rename = "gitops")]
    Gitops,

    /// Deployed directly as a Helm release.
    #[db_rename = "helm"]
    #[serde(rename = "helm")]
    #[default]
    Helm,

    /// Deployed through the Flux controller.
    #[db_rename = "flux"]
    #[serde(rename = "flux")]
    Flux,
}

impl DeploymentAppType {
    /// Returns whether the pipeline deploys through the GitOps controller.
    #[inline]
    pub fn is_gitops(self) -> bool {
        matches!(self, DeploymentAppType::Gitops)
    }

    /// Returns whether the pipeline deploys as a plain Helm release.
    #[inline]
    pub fn is_helm(self) -> bool {
        matches!(self, DeploymentAppType::Helm)
    }

    /// Returns whether the pipeline deploys through Flux.
    #[inline]
    pub fn is_flux(self) -> bool {
        matches!(self, DeploymentAppType::Flux)
    }
}
