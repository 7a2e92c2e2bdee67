//! Pipeline status timeline table constraint violations.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::ConstraintCategory;

/// Pipeline status timeline table constraint violations.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[derive(Serialize, Deserialize, Display, EnumIter, EnumString)]
#[serde(into = "String", try_from = "String")]
pub enum PipelineStatusTimelineConstraints {
    // Timeline owner constraints
    #[strum(serialize = "pipeline_status_timeline_owner_present")]
    OwnerPresent,
}

impl PipelineStatusTimelineConstraints {
    /// Creates a new [`PipelineStatusTimelineConstraints`] from the constraint name.
    pub fn new(constraint: &str) -> Option<Self> {
        constraint.parse().ok()
    }

    /// Returns the category of this constraint violation.
    pub fn categorize(&self) -> ConstraintCategory {
        match self {
            PipelineStatusTimelineConstraints::OwnerPresent => ConstraintCategory::BusinessLogic,
        }
    }
}

impl From<PipelineStatusTimelineConstraints> for String {
    #[inline]
    fn from(val: PipelineStatusTimelineConstraints) -> Self {
        val.to_string()
    }
}

impl TryFrom<String> for PipelineStatusTimelineConstraints {
    type Error = strum::ParseError;

    #[inline]
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
