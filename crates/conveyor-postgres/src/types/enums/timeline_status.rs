//! Timeline status enumeration tracking deployment progress milestones.

use diesel_derive_enum::DbEnum;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Defines the milestones recorded against a deployment as it progresses.
///
/// This enumeration corresponds to the `TIMELINE_STATUS` PostgreSQL enum.
/// Each workflow runner accumulates an ordered trail of timeline rows from
/// `Queued` through the GitOps hand-off milestones to one terminal entry.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[derive(Serialize, Deserialize, DbEnum, Display, EnumIter, EnumString)]
#[ExistingTypePath = "crate::schema::sql_types::TimelineStatus"]
pub enum TimelineStatus {
    /// Deployment request accepted and waiting to start.
    #[db_rename = "queued"]
    #[serde(rename = "queued")]
    #[default]
    Queued,

    /// Desired manifest committed to the GitOps repository.
    #[db_rename = "git_commit"]
    #[serde(rename = "git_commit")]
    GitCommit,

    /// Commit to the GitOps repository failed.
    #[db_rename = "git_commit_failed"]
    #[serde(rename = "git_commit_failed")]
    GitCommitFailed,

    /// Argo CD sync requested for the committed revision.
    #[db_rename = "argocd_sync_initiated"]
    #[serde(rename = "argocd_sync_initiated")]
    ArgocdSyncInitiated,

    /// Argo CD reported the sync operation finished.
    #[db_rename = "argocd_sync_completed"]
    #[serde(rename = "argocd_sync_completed")]
    ArgocdSyncCompleted,

    /// Controller began applying manifests to the cluster.
    #[db_rename = "kubectl_apply_started"]
    #[serde(rename = "kubectl_apply_started")]
    KubectlApplyStarted,

    /// All manifests applied and synced at the target revision.
    #[db_rename = "kubectl_apply_synced"]
    #[serde(rename = "kubectl_apply_synced")]
    KubectlApplySynced,

    /// Application reached a healthy state after apply.
    #[db_rename = "app_healthy"]
    #[serde(rename = "app_healthy")]
    AppHealthy,

    /// Deployment failed. Terminal.
    #[db_rename = "deployment_failed"]
    #[serde(rename = "deployment_failed")]
    DeploymentFailed,

    /// Deployment replaced by a newer one for the same pipeline. Terminal.
    #[db_rename = "superseded"]
    #[serde(rename = "superseded")]
    Superseded,

    /// Status endpoint of the release backend could not be reached.
    #[db_rename = "unable_to_fetch"]
    #[serde(rename = "unable_to_fetch")]
    UnableToFetch,

    /// Status fetch from the release backend timed out.
    #[db_rename = "fetch_timed_out"]
    #[serde(rename = "fetch_timed_out")]
    FetchTimedOut,

    /// Deployment completed successfully. Terminal.
    #[db_rename = "deployment_succeeded"]
    #[serde(rename = "deployment_succeeded")]
    DeploymentSucceeded,
}

impl TimelineStatus {
    /// Timeline statuses that end the trail for a runner.
    ///
    /// At most one terminal timeline row may exist per workflow runner. Once
    /// one is written the reconciler stops appending milestones.
    pub const TERMINAL: [TimelineStatus; 3] = [
        TimelineStatus::DeploymentSucceeded,
        TimelineStatus::DeploymentFailed,
        TimelineStatus::Superseded,
    ];

    /// Transient fetch-problem markers that overwrite in place.
    ///
    /// Instead of appending a new row on every failed status poll, the single
    /// existing marker row for a runner is updated so the trail stays bounded.
    pub const REDUNDANT_MARKERS: [TimelineStatus; 2] =
        [TimelineStatus::UnableToFetch, TimelineStatus::FetchTimedOut];

    /// Returns whether this status ends the timeline trail for a runner.
    #[inline]
    pub fn is_terminal(self) -> bool {
        Self::TERMINAL.contains(&self)
    }

    /// Returns whether this status overwrites its previous row instead of
    /// appending a new one.
    #[inline]
    pub fn is_redundant_marker(self) -> bool {
        Self::REDUNDANT_MARKERS.contains(&self)
    }

    /// Returns the standard human-readable detail recorded with this status
    /// when the caller does not supply one.
    pub fn default_detail(self) -> &'static str {
        match self {
            TimelineStatus::Queued => "Deployment initiated successfully.",
            TimelineStatus::GitCommit => "Git commit done successfully.",
            TimelineStatus::GitCommitFailed => "Git commit failed.",
            TimelineStatus::ArgocdSyncInitiated => "argocd sync initiated.",
            TimelineStatus::ArgocdSyncCompleted => "argocd sync completed.",
            TimelineStatus::KubectlApplyStarted => "Kubectl apply initiated successfully.",
            TimelineStatus::KubectlApplySynced => "Kubectl apply synced successfully.",
            TimelineStatus::AppHealthy => "App status is Healthy.",
            TimelineStatus::DeploymentFailed => "Deployment failed.",
            TimelineStatus::Superseded => "This deployment is superseded.",
            TimelineStatus::UnableToFetch => {
                "Failed to connect to Argo CD to fetch deployment status."
            }
            TimelineStatus::FetchTimedOut => "Deployment status fetch timed out.",
            TimelineStatus::DeploymentSucceeded => "Deployment succeeded.",
        }
    }
}

#[cfg(test)]
mod test {
    use strum::IntoEnumIterator;

    use super::TimelineStatus;

    #[test]
    fn terminal_and_marker_sets_are_disjoint() {
        for status in TimelineStatus::TERMINAL {
            assert!(!status.is_redundant_marker());
        }

        for status in TimelineStatus::REDUNDANT_MARKERS {
            assert!(!status.is_terminal());
        }
    }

    #[test]
    fn every_status_has_a_default_detail() {
        for status in TimelineStatus::iter() {
            assert!(!status.default_detail().is_empty());
        }
    }

    #[test]
    fn progress_milestones_are_neither_terminal_nor_markers() {
        let milestones = [
            TimelineStatus::Queued,
            TimelineStatus::GitCommit,
            TimelineStatus::ArgocdSyncInitiated,
            TimelineStatus::ArgocdSyncCompleted,
            TimelineStatus::KubectlApplyStarted,
            TimelineStatus::KubectlApplySynced,
            TimelineStatus::AppHealthy,
        ];

        for status in milestones {
            assert!(!status.is_terminal(), "{status} should not be terminal");
            assert!(!status.is_redundant_marker(), "{status} should not be a marker");
        }
    }
}
