//! CI workflow status latest table constraint violations.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::ConstraintCategory;

/// CI workflow status latest table constraint violations.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[derive(Serialize, Deserialize, Display, EnumIter, EnumString)]
#[serde(into = "String", try_from = "String")]
pub enum CiWorkflowStatusLatestConstraints {
    // Latest index uniqueness constraints
    #[strum(serialize = "ci_workflow_status_latest_pipeline_unique_idx")]
    PipelineUnique,
}

impl CiWorkflowStatusLatestConstraints {
    /// Creates a new [`CiWorkflowStatusLatestConstraints`] from the constraint name.
    pub fn new(constraint: &str) -> Option<Self> {
        constraint.parse().ok()
    }

    /// Returns the category of this constraint violation.
    pub fn categorize(&self) -> ConstraintCategory {
        match self {
            CiWorkflowStatusLatestConstraints::PipelineUnique => ConstraintCategory::Uniqueness,
        }
    }
}

impl From<CiWorkflowStatusLatestConstraints> for String {
    #[inline]
    fn from(val: CiWorkflowStatusLatestConstraints) -> Self {
        val.to_string()
    }
}

impl TryFrom<String> for CiWorkflowStatusLatestConstraints {
    type Error = strum::ParseError;

    #[inline]
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
