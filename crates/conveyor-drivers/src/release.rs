//! Release driver trait and the normalized application status model.

use std::fmt;

use async_trait::async_trait;
use conveyor_postgres::model::Pipeline;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::DriverResult;

/// Shortest revision prefix accepted when comparing git hashes.
///
/// Matches git's default abbreviation length so a truncated revision from a
/// backend still compares, while rejecting trivially short prefixes.
const MIN_REVISION_PREFIX_LEN: usize = 7;

/// Identifies a deployed application on a release backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppIdentifier {
    /// Application id the pipeline belongs to.
    pub app_id: i64,
    /// Environment id the pipeline deploys into.
    pub env_id: i64,
    /// Release name on the backend (helm release or gitops application name).
    pub release_name: String,
    /// Namespace the release lives in.
    pub namespace: String,
}

impl AppIdentifier {
    /// Creates a new application identifier.
    pub fn new(
        app_id: i64,
        env_id: i64,
        release_name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            app_id,
            env_id,
            release_name: release_name.into(),
            namespace: namespace.into(),
        }
    }

    /// Builds the identifier for a pipeline's deployed application.
    pub fn from_pipeline(pipeline: &Pipeline) -> Self {
        Self::new(
            pipeline.app_id,
            pipeline.environment_id,
            pipeline.deployment_app_name.clone(),
            pipeline.environment_name.clone(),
        )
    }
}

impl fmt::Display for AppIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.release_name)
    }
}

/// Application health as reported by the backend.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "PascalCase")]
#[strum(serialize_all = "PascalCase", ascii_case_insensitive)]
pub enum HealthStatus {
    /// The application is fully rolled out and healthy.
    Healthy,
    /// The application is running but reports a degraded condition.
    Degraded,
    /// A rollout or reconcile is still in progress.
    Progressing,
    /// Reconciliation is suspended on the backend.
    Suspended,
    /// The application object exists but its resources are missing.
    Missing,
    /// The backend could not determine health.
    #[default]
    Unknown,
}

impl HealthStatus {
    /// Returns whether the application is healthy.
    pub fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Returns whether the application is degraded.
    pub fn is_degraded(self) -> bool {
        matches!(self, Self::Degraded)
    }
}

/// Release lifecycle status, normalized across backends.
///
/// Helm reports these natively. For gitops and flux backends the value is
/// derived from the last operation outcome.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ReleaseStatus {
    /// The release is installed and current.
    Deployed,
    /// A newer release replaced this one.
    Superseded,
    /// The last install or upgrade failed.
    Failed,
    /// An install is pending.
    PendingInstall,
    /// An upgrade is pending.
    PendingUpgrade,
    /// A rollback is pending.
    PendingRollback,
    /// The release was uninstalled.
    Uninstalled,
    /// The backend reported a status this client does not model.
    #[default]
    Unknown,
}

impl ReleaseStatus {
    /// Returns whether the release is installed and current.
    pub fn is_deployed(self) -> bool {
        matches!(self, Self::Deployed)
    }

    /// Returns whether the last release operation failed.
    pub fn is_failed(self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Returns whether a newer release replaced this one.
    pub fn is_superseded(self) -> bool {
        matches!(self, Self::Superseded)
    }

    /// Returns whether an install, upgrade, or rollback is still pending.
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            Self::PendingInstall | Self::PendingUpgrade | Self::PendingRollback
        )
    }
}

/// Whether the live state matches the desired revision (gitops backends).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "PascalCase")]
#[strum(serialize_all = "PascalCase", ascii_case_insensitive)]
pub enum SyncStatus {
    /// Live state matches the target revision.
    Synced,
    /// Live state differs from the target revision.
    OutOfSync,
    /// The backend could not compare.
    #[default]
    Unknown,
}

impl SyncStatus {
    /// Returns whether live state matches the target revision.
    pub fn is_synced(self) -> bool {
        matches!(self, Self::Synced)
    }
}

/// Phase of the most recent sync operation (gitops backends).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "PascalCase")]
#[strum(serialize_all = "PascalCase", ascii_case_insensitive)]
pub enum OperationPhase {
    /// The operation is still running.
    Running,
    /// The operation completed successfully.
    Succeeded,
    /// The operation completed and failed.
    Failed,
    /// The operation errored before completing.
    Error,
    /// The operation is being terminated.
    Terminating,
}

impl OperationPhase {
    /// Returns whether the operation reached a final phase.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Error)
    }

    /// Returns whether the operation completed successfully.
    pub fn is_successful(self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Returns whether the operation completed unsuccessfully.
    pub fn is_failed(self) -> bool {
        matches!(self, Self::Failed | Self::Error)
    }
}

/// Normalized live status of a deployed application.
///
/// Fields that only some backends report are optional; the reconciler decides
/// per deployment app type which of them participate in the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppStatus {
    /// Application health.
    pub health: HealthStatus,
    /// Release lifecycle status.
    pub release_status: ReleaseStatus,
    /// Sync comparison result, when the backend tracks a target revision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_status: Option<SyncStatus>,
    /// Phase of the most recent sync operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_phase: Option<OperationPhase>,
    /// Revision (git hash) the live state was synced to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synced_revision: Option<String>,
    /// When the release was last deployed or the last operation finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_deployed_at: Option<Timestamp>,
    /// Human-readable status detail from the backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AppStatus {
    /// Returns whether the application is healthy.
    pub fn is_healthy(&self) -> bool {
        self.health.is_healthy()
    }

    /// Returns whether the release is deployed and the application healthy.
    pub fn is_deployed_and_healthy(&self) -> bool {
        self.release_status.is_deployed() && self.health.is_healthy()
    }

    /// Returns whether the most recent operation finished successfully.
    pub fn operation_succeeded(&self) -> bool {
        self.operation_phase.is_some_and(OperationPhase::is_successful)
    }

    /// Compares the synced revision against a stored commit hash.
    ///
    /// Backends that abbreviate hashes match on prefix, provided the shorter
    /// side is at least seven characters. Equal-length hashes must match
    /// exactly. Comparison ignores hex case.
    pub fn matches_revision(&self, git_hash: &str) -> bool {
        let Some(revision) = self.synced_revision.as_deref() else {
            return false;
        };
        if revision.len() == git_hash.len() {
            return !revision.is_empty() && revision.eq_ignore_ascii_case(git_hash);
        }
        if revision.len() < git_hash.len() {
            hash_prefix_matches(git_hash, revision)
        } else {
            hash_prefix_matches(revision, git_hash)
        }
    }
}

fn hash_prefix_matches(full: &str, prefix: &str) -> bool {
    prefix.len() >= MIN_REVISION_PREFIX_LEN
        && full
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Outcome of a sync request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    /// Whether a new sync operation was started.
    pub triggered: bool,
    /// Revision the sync targets, when the backend reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    /// Detail message from the backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SyncResult {
    /// Creates a result for a sync that was started.
    pub fn triggered(revision: Option<String>) -> Self {
        Self {
            triggered: true,
            revision,
            message: None,
        }
    }

    /// Creates a result for a sync that was not started.
    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            triggered: false,
            revision: None,
            message: Some(message.into()),
        }
    }

    /// Attaches a detail message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Install or upgrade request submitted to a release backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallRequest {
    /// Target application.
    pub app: AppIdentifier,
    /// Container image to roll out.
    pub image: String,
    /// Image digest, when the artifact carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_digest: Option<String>,
    /// Merged values override applied on top of the chart defaults.
    pub values_override: serde_json::Value,
    /// Chart name, when the backend needs it to resolve the release.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_name: Option<String>,
    /// Chart version to pin the release to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_version: Option<String>,
}

impl InstallRequest {
    /// Creates a new install request for an application and image.
    pub fn new(app: AppIdentifier, image: impl Into<String>) -> Self {
        Self {
            app,
            image: image.into(),
            image_digest: None,
            values_override: serde_json::Value::Null,
            chart_name: None,
            chart_version: None,
        }
    }

    /// Sets the image digest.
    pub fn with_image_digest(mut self, digest: impl Into<String>) -> Self {
        self.image_digest = Some(digest.into());
        self
    }

    /// Sets the values override.
    pub fn with_values_override(mut self, values: serde_json::Value) -> Self {
        self.values_override = values;
        self
    }

    /// Pins the chart name and version.
    pub fn with_chart(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.chart_name = Some(name.into());
        self.chart_version = Some(version.into());
        self
    }
}

/// Outcome of an accepted install or upgrade request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallResult {
    /// Release name the request resolved to.
    pub release_name: String,
    /// Revision produced by the request (git commit for gitops backends).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    /// Detail message from the backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Capability trait for release backends.
///
/// One implementation exists per deployment app type. The engine queries
/// backends through this trait and never mutates controller state in any
/// other way.
#[async_trait]
pub trait ReleaseDriver: Send + Sync {
    /// Backend name for logs and diagnostics.
    fn driver_name(&self) -> &'static str;

    /// Fetches the live release and application status.
    async fn status(&self, app: &AppIdentifier) -> DriverResult<AppStatus>;

    /// Requests the backend to re-sync the application toward its target
    /// state.
    async fn sync(&self, app: &AppIdentifier) -> DriverResult<SyncResult>;

    /// Submits an install or upgrade request.
    async fn install(&self, request: &InstallRequest) -> DriverResult<InstallResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_with_revision(revision: &str) -> AppStatus {
        AppStatus {
            health: HealthStatus::Healthy,
            release_status: ReleaseStatus::Deployed,
            sync_status: Some(SyncStatus::Synced),
            operation_phase: Some(OperationPhase::Succeeded),
            synced_revision: Some(revision.to_owned()),
            last_deployed_at: None,
            description: None,
        }
    }

    #[test]
    fn test_full_hash_comparison() {
        let full = "5e66fa1f6c3b1f0a9d2e8c4b7a6f5d4e3c2b1a09";
        let status = status_with_revision(full);

        assert!(status.matches_revision(full));
        assert!(status.matches_revision(&full.to_uppercase()));
        assert!(!status.matches_revision("5e66fa1f6c3b1f0a9d2e8c4b7a6f5d4e3c2b1a00"));
    }

    #[test]
    fn test_short_hash_prefix_comparison() {
        let full = "5e66fa1f6c3b1f0a9d2e8c4b7a6f5d4e3c2b1a09";
        let status = status_with_revision("5e66fa1");

        assert!(status.matches_revision(full));
        assert!(!status.matches_revision("0e66fa1f6c3b1f0a9d2e8c4b7a6f5d4e3c2b1a09"));
    }

    #[test]
    fn test_too_short_prefix_rejected() {
        let full = "5e66fa1f6c3b1f0a9d2e8c4b7a6f5d4e3c2b1a09";

        let status = status_with_revision("5e66fa");
        assert!(!status.matches_revision(full));

        let mut status = status_with_revision("");
        assert!(!status.matches_revision(full));
        status.synced_revision = None;
        assert!(!status.matches_revision(full));
    }

    #[test]
    fn test_status_parsing_is_case_insensitive() {
        assert_eq!(
            "healthy".parse::<HealthStatus>().unwrap(),
            HealthStatus::Healthy
        );
        assert_eq!(
            "Deployed".parse::<ReleaseStatus>().unwrap(),
            ReleaseStatus::Deployed
        );
        assert_eq!(
            "pending-install".parse::<ReleaseStatus>().unwrap(),
            ReleaseStatus::PendingInstall
        );
        assert!("not-a-status".parse::<ReleaseStatus>().is_err());
    }

    #[test]
    fn test_status_display_round_trip() {
        assert_eq!(HealthStatus::Degraded.to_string(), "Degraded");
        assert_eq!(ReleaseStatus::PendingUpgrade.to_string(), "pending-upgrade");
        assert_eq!(SyncStatus::OutOfSync.to_string(), "OutOfSync");
        assert_eq!(OperationPhase::Succeeded.to_string(), "Succeeded");
    }
}
