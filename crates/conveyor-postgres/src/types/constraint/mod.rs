//! Database constraint violations organized by functional area.
//!
//! This module provides a comprehensive enumeration of all database constraint violations,
//! organized into logical groups for better maintainability.

// App-related constraint modules
mod app;

// Status-tracking constraint modules
mod deployment_app_status;
mod pipeline_status_sync_detail;
mod pipeline_status_timeline;

// Workflow-related constraint modules
mod cd_workflow_status_latest;
mod ci_workflow_status_latest;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use self::app::AppConstraints;
pub use self::cd_workflow_status_latest::CdWorkflowStatusLatestConstraints;
pub use self::ci_workflow_status_latest::CiWorkflowStatusLatestConstraints;
pub use self::deployment_app_status::DeploymentAppStatusConstraints;
pub use self::pipeline_status_sync_detail::PipelineStatusSyncDetailConstraints;
pub use self::pipeline_status_timeline::PipelineStatusTimelineConstraints;

/// Unified constraint violation enum that can represent any database constraint.
///
/// This enum wraps all specific constraint types, providing a single interface
/// for handling any constraint violation while maintaining type safety and
/// organizational benefits of the separate modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ConstraintViolation {
    // App-related constraints
    App(AppConstraints),

    // Status-tracking constraints
    PipelineStatusTimeline(PipelineStatusTimelineConstraints),
    PipelineStatusSyncDetail(PipelineStatusSyncDetailConstraints),
    DeploymentAppStatus(DeploymentAppStatusConstraints),

    // Workflow-related constraints
    CiWorkflowStatusLatest(CiWorkflowStatusLatestConstraints),
    CdWorkflowStatusLatest(CdWorkflowStatusLatestConstraints),
}

/// Categories of database constraint violations.
///
/// This enum helps classify constraint violations by their purpose and type,
/// making it easier to handle different categories of errors appropriately.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintCategory {
    /// Data validation constraints (format, length, range checks).
    Validation,
    /// Chronological integrity constraints (timestamp relationships).
    Chronological,
    /// Business logic constraints (domain-specific rules).
    BusinessLogic,
    /// Uniqueness constraints (primary keys, unique indexes).
    Uniqueness,
}

impl ConstraintViolation {
    /// Creates a new [`ConstraintViolation`] from the constraint name.
    ///
    /// This method attempts to parse a constraint name string into the corresponding
    /// enum variant. It returns `None` if the constraint name is not recognized.
    ///
    /// # Arguments
    ///
    /// * `constraint` - The name of the database constraint that was violated
    ///
    /// # Returns
    ///
    /// * `Some(ConstraintViolation)` if the constraint name is recognized
    /// * `None` if the constraint name is unknown
    ///
    /// # Examples
    ///
    /// ```
    /// use conveyor_postgres::types::ConstraintViolation;
    ///
    /// let violation = ConstraintViolation::new("app_app_name_unique_idx");
    /// assert!(violation.is_some());
    ///
    /// let unknown = ConstraintViolation::new("unknown_constraint");
    /// assert!(unknown.is_none());
    /// ```
    pub fn new(constraint: &str) -> Option<Self> {
        let prefix = constraint.split('_').next()?;
        macro_rules! try_parse {
            ($($parser:expr => $variant:ident),+ $(,)?) => {
                None$(.or_else(|| $parser(constraint).map(Self::$variant)))+
            };
        }

        match prefix {
            "app" => try_parse!(AppConstraints::new => App),
            "pipeline" => try_parse! {
                PipelineStatusTimelineConstraints::new => PipelineStatusTimeline,
                PipelineStatusSyncDetailConstraints::new => PipelineStatusSyncDetail,
            },
            "ci" => try_parse!(CiWorkflowStatusLatestConstraints::new => CiWorkflowStatusLatest),
            "cd" => try_parse!(CdWorkflowStatusLatestConstraints::new => CdWorkflowStatusLatest),
            "deployment" => try_parse!(DeploymentAppStatusConstraints::new => DeploymentAppStatus),
            _ => None,
        }
    }

    /// Returns the table name associated with this constraint.
    ///
    /// This is useful for categorizing errors by the table they affect.
    pub fn table_name(&self) -> &'static str {
        match self {
            // App-related tables
            ConstraintViolation::App(_) => "app",

            // Status-tracking tables
            ConstraintViolation::PipelineStatusTimeline(_) => "pipeline_status_timeline",
            ConstraintViolation::PipelineStatusSyncDetail(_) => "pipeline_status_sync_detail",
            ConstraintViolation::DeploymentAppStatus(_) => "deployment_app_status",

            // Workflow-related tables
            ConstraintViolation::CiWorkflowStatusLatest(_) => "ci_workflow_status_latest",
            ConstraintViolation::CdWorkflowStatusLatest(_) => "cd_workflow_status_latest",
        }
    }

    /// Returns the functional area this constraint belongs to.
    ///
    /// This groups constraints by their business domain for higher-level categorization.
    pub fn functional_area(&self) -> &'static str {
        match self {
            ConstraintViolation::App(_) => "apps",

            ConstraintViolation::PipelineStatusTimeline(_)
            | ConstraintViolation::PipelineStatusSyncDetail(_)
            | ConstraintViolation::DeploymentAppStatus(_) => "status",

            ConstraintViolation::CiWorkflowStatusLatest(_)
            | ConstraintViolation::CdWorkflowStatusLatest(_) => "workflows",
        }
    }

    /// Returns the category of this constraint violation.
    ///
    /// This helps categorize errors by their type for better error handling and reporting.
    pub fn constraint_category(&self) -> ConstraintCategory {
        match self {
            ConstraintViolation::App(c) => c.categorize(),

            ConstraintViolation::PipelineStatusTimeline(c) => c.categorize(),
            ConstraintViolation::PipelineStatusSyncDetail(c) => c.categorize(),
            ConstraintViolation::DeploymentAppStatus(c) => c.categorize(),

            ConstraintViolation::CiWorkflowStatusLatest(c) => c.categorize(),
            ConstraintViolation::CdWorkflowStatusLatest(c) => c.categorize(),
        }
    }

    /// Returns the underlying constraint name as used in the database.
    #[inline]
    pub fn constraint_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintViolation::App(c) => write!(f, "{}", c),

            ConstraintViolation::PipelineStatusTimeline(c) => write!(f, "{}", c),
            ConstraintViolation::PipelineStatusSyncDetail(c) => write!(f, "{}", c),
            ConstraintViolation::DeploymentAppStatus(c) => write!(f, "{}", c),

            ConstraintViolation::CiWorkflowStatusLatest(c) => write!(f, "{}", c),
            ConstraintViolation::CdWorkflowStatusLatest(c) => write!(f, "{}", c),
        }
    }
}

impl From<ConstraintViolation> for String {
    #[inline]
    fn from(val: ConstraintViolation) -> Self {
        val.to_string()
    }
}

impl TryFrom<String> for ConstraintViolation {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value).ok_or_else(|| format!("Unknown constraint: {}", value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_parsing() {
        assert_eq!(
            ConstraintViolation::new("app_app_name_unique_idx"),
            Some(ConstraintViolation::App(AppConstraints::AppNameUnique))
        );

        assert_eq!(
            ConstraintViolation::new("pipeline_status_sync_detail_runner_unique_idx"),
            Some(ConstraintViolation::PipelineStatusSyncDetail(
                PipelineStatusSyncDetailConstraints::RunnerUnique
            ))
        );

        assert_eq!(
            ConstraintViolation::new("cd_workflow_status_latest_pipeline_type_unique_idx"),
            Some(ConstraintViolation::CdWorkflowStatusLatest(
                CdWorkflowStatusLatestConstraints::PipelineTypeUnique
            ))
        );

        assert_eq!(ConstraintViolation::new("unknown_constraint"), None);
    }

    #[test]
    fn test_table_name_extraction() {
        let violation = ConstraintViolation::App(AppConstraints::AppNameUnique);
        assert_eq!(violation.table_name(), "app");

        let violation = ConstraintViolation::PipelineStatusTimeline(
            PipelineStatusTimelineConstraints::OwnerPresent,
        );
        assert_eq!(violation.table_name(), "pipeline_status_timeline");

        let violation = ConstraintViolation::DeploymentAppStatus(
            DeploymentAppStatusConstraints::AppEnvUnique,
        );
        assert_eq!(violation.table_name(), "deployment_app_status");
    }

    #[test]
    fn test_functional_area_extraction() {
        let violation = ConstraintViolation::App(AppConstraints::AppNameUnique);
        assert_eq!(violation.functional_area(), "apps");

        let violation = ConstraintViolation::PipelineStatusSyncDetail(
            PipelineStatusSyncDetailConstraints::RunnerUnique,
        );
        assert_eq!(violation.functional_area(), "status");

        let violation = ConstraintViolation::CiWorkflowStatusLatest(
            CiWorkflowStatusLatestConstraints::PipelineUnique,
        );
        assert_eq!(violation.functional_area(), "workflows");
    }

    #[test]
    fn test_constraint_categorization() {
        let violation = ConstraintViolation::PipelineStatusTimeline(
            PipelineStatusTimelineConstraints::OwnerPresent,
        );
        assert_eq!(
            violation.constraint_category(),
            ConstraintCategory::BusinessLogic
        );

        let violation = ConstraintViolation::CdWorkflowStatusLatest(
            CdWorkflowStatusLatestConstraints::PipelineTypeUnique,
        );
        assert_eq!(
            violation.constraint_category(),
            ConstraintCategory::Uniqueness
        );
    }

    #[test]
    fn test_constraint_name_method() {
        let violation = ConstraintViolation::PipelineStatusSyncDetail(
            PipelineStatusSyncDetailConstraints::OwnerPresent,
        );
        assert_eq!(
            violation.constraint_name(),
            "pipeline_status_sync_detail_owner_present"
        );
    }
}
