//! CD workflow status latest table constraint violations.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::ConstraintCategory;

/// CD workflow status latest table constraint violations.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[derive(Serialize, Deserialize, Display, EnumIter, EnumString)]
#[serde(into = "String", try_from = "String")]
pub enum CdWorkflowStatusLatestConstraints {
    // Latest index uniqueness constraints
    #[strum(serialize = "cd_workflow_status_latest_pipeline_type_unique_idx")]
    PipelineTypeUnique,
}

impl CdWorkflowStatusLatestConstraints {
    /// Creates a new [`CdWorkflowStatusLatestConstraints`] from the constraint name.
    pub fn new(constraint: &str) -> Option<Self> {
        constraint.parse().ok()
    }

    /// Returns the category of this constraint violation.
    pub fn categorize(&self) -> ConstraintCategory {
        match self {
            CdWorkflowStatusLatestConstraints::PipelineTypeUnique => {
                ConstraintCategory::Uniqueness
            }
        }
    }
}

impl From<CdWorkflowStatusLatestConstraints> for String {
    #[inline]
    fn from(val: CdWorkflowStatusLatestConstraints) -> Self {
        val.to_string()
    }
}

impl TryFrom<String> for CdWorkflowStatusLatestConstraints {
    type Error = strum::ParseError;

    #[inline]
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
