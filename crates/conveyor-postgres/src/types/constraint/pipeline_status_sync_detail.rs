//! Pipeline status sync detail table constraint violations.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::ConstraintCategory;

/// Pipeline status sync detail table constraint violations.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[derive(Serialize, Deserialize, Display, EnumIter, EnumString)]
#[serde(into = "String", try_from = "String")]
pub enum PipelineStatusSyncDetailConstraints {
    // Sync detail owner constraints
    #[strum(serialize = "pipeline_status_sync_detail_owner_present")]
    OwnerPresent,

    // Sync detail uniqueness constraints
    #[strum(serialize = "pipeline_status_sync_detail_runner_unique_idx")]
    RunnerUnique,
}

impl PipelineStatusSyncDetailConstraints {
    /// Creates a new [`PipelineStatusSyncDetailConstraints`] from the constraint name.
    pub fn new(constraint: &str) -> Option<Self> {
        constraint.parse().ok()
    }

    /// Returns the category of this constraint violation.
    pub fn categorize(&self) -> ConstraintCategory {
        match self {
            PipelineStatusSyncDetailConstraints::OwnerPresent => ConstraintCategory::BusinessLogic,
            PipelineStatusSyncDetailConstraints::RunnerUnique => ConstraintCategory::Uniqueness,
        }
    }
}

impl From<PipelineStatusSyncDetailConstraints> for String {
    #[inline]
    fn from(val: PipelineStatusSyncDetailConstraints) -> Self {
        val.to_string()
    }
}

impl TryFrom<String> for PipelineStatusSyncDetailConstraints {
    type Error = strum::ParseError;

    #[inline]
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
