//! App table constraint violations.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::ConstraintCategory;

/// App table constraint violations.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[derive(Serialize, Deserialize, Display, EnumIter, EnumString)]
#[serde(into = "String", try_from = "String")]
pub enum AppConstraints {
    // App uniqueness constraints
    #[strum(serialize = "app_app_name_unique_idx")]
    AppNameUnique,
}

impl AppConstraints {
    /// Creates a new [`AppConstraints`] from the constraint name.
    pub fn new(constraint: &str) -> Option<Self> {
        constraint.parse().ok()
    }

    /// Returns the category of this constraint violation.
    pub fn categorize(&self) -> ConstraintCategory {
        match self {
            AppConstraints::AppNameUnique => ConstraintCategory::Uniqueness,
        }
    }
}

impl From<AppConstraints> for String {
    #[inline]
    fn from(val: AppConstraints) -> Self {
        val.to_string()
    }
}

impl TryFrom<String> for AppConstraints {
    type Error = strum::ParseError;

    #[inline]
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
