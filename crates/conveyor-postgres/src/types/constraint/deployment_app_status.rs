//! Deployment app status table constraint violations.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::ConstraintCategory;

/// Deployment app status table constraint violations.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[derive(Serialize, Deserialize, Display, EnumIter, EnumString)]
#[serde(into = "String", try_from = "String")]
pub enum DeploymentAppStatusConstraints {
    // Health record uniqueness constraints
    #[strum(serialize = "deployment_app_status_app_env_unique_idx")]
    AppEnvUnique,
}

impl DeploymentAppStatusConstraints {
    /// Creates a new [`DeploymentAppStatusConstraints`] from the constraint name.
    pub fn new(constraint: &str) -> Option<Self> {
        constraint.parse().ok()
    }

    /// Returns the category of this constraint violation.
    pub fn categorize(&self) -> ConstraintCategory {
        match self {
            DeploymentAppStatusConstraints::AppEnvUnique => ConstraintCategory::Uniqueness,
        }
    }
}

impl From<DeploymentAppStatusConstraints> for String {
    #[inline]
    fn from(val: DeploymentAppStatusConstraints) -> Self {
        val.to_string()
    }
}

impl TryFrom<String> for DeploymentAppStatusConstraints {
    type Error = strum::ParseError;

    #[inline]
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
