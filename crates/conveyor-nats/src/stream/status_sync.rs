//! Pipeline status sync request payload.

use serde::{Deserialize, Serialize};

/// Request to refresh the deployment status of one pipeline right away.
///
/// Emitted when a user asks for an immediate status resync instead of
/// waiting for the next reconciler sweep. Exactly one of `pipeline_id` and
/// `installed_app_version_id` is set, depending on whether the target is a
/// CD pipeline or an app-store install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct PipelineStatusSyncEvent {
    /// CD pipeline to refresh.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<i64>,
    /// Installed app version to refresh, for app-store applications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_app_version_id: Option<i64>,
    /// User who requested the refresh.
    pub user_id: i64,
    /// Whether the target is an app-store (chart) install.
    pub is_app_store_application: bool,
}

impl PipelineStatusSyncEvent {
    /// Sync request for a CD pipeline.
    #[must_use]
    pub fn for_pipeline(pipeline_id: i64, user_id: i64) -> Self {
        Self {
            pipeline_id: Some(pipeline_id),
            installed_app_version_id: None,
            user_id,
            is_app_store_application: false,
        }
    }

    /// Sync request for an app-store install.
    #[must_use]
    pub fn for_installed_app(installed_app_version_id: i64, user_id: i64) -> Self {
        Self {
            pipeline_id: None,
            installed_app_version_id: Some(installed_app_version_id),
            user_id,
            is_app_store_application: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_pipeline_targets_pipeline() {
        let event = PipelineStatusSyncEvent::for_pipeline(42, 1);
        assert_eq!(event.pipeline_id, Some(42));
        assert_eq!(event.installed_app_version_id, None);
        assert!(!event.is_app_store_application);
    }

    #[test]
    fn test_for_installed_app_targets_install() {
        let event = PipelineStatusSyncEvent::for_installed_app(9, 1);
        assert_eq!(event.pipeline_id, None);
        assert_eq!(event.installed_app_version_id, Some(9));
        assert!(event.is_app_store_application);
    }

    #[test]
    fn test_unset_target_omitted_from_wire() {
        let event = PipelineStatusSyncEvent::for_pipeline(42, 1);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"pipeline_id\":42"));
        assert!(!json.contains("installed_app_version_id"));
    }
}
