//! CI build completion event payload.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// CI build completion event that seeds artifacts and downstream triggers.
///
/// Published when a CI pipeline finishes producing an image. Consumption
/// registers the artifact (plus any plugin-produced copies in other
/// registries) and fans out automatic deployments to the CD pipelines
/// directly downstream of the CI pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct CiCompleteEvent {
    /// Unique id of this event, for correlating logs across services.
    pub event_id: Uuid,
    /// CI pipeline that produced the image.
    pub pipeline_id: i64,
    /// CI workflow execution that finished.
    pub workflow_id: i64,
    /// Fully qualified image reference.
    pub image: String,
    /// Digest of the pushed image.
    pub image_digest: String,
    /// Source material description (commits, webhook data) as raw JSON.
    pub material_info: serde_json::Value,
    /// Where the artifact metadata originated, e.g. `"CI-RUNNER"`.
    pub data_source: String,
    /// Whether the image was scheduled for vulnerability scanning.
    pub is_scan_enabled: bool,
    /// Whether the workflow uploaded its artifact archive.
    pub is_artifact_uploaded: bool,
    /// Images copied to other registries by CI plugins, keyed by registry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_registry_artifact_details: Option<HashMap<String, Vec<String>>>,
    /// User the workflow ran as.
    pub user_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ci_complete_roundtrip_with_plugin_artifacts() {
        let event = CiCompleteEvent {
            event_id: Uuid::new_v4(),
            pipeline_id: 12,
            workflow_id: 3400,
            image: "registry.example.com/acme/web:abc123".to_string(),
            image_digest: "sha256:6c3c624b58dbbcd3c0dd82b4c53f04194d1247c6eebdaab7c610cf7d66709b3b"
                .to_string(),
            material_info: serde_json::json!([{"commit": "abc123"}]),
            data_source: "CI-RUNNER".to_string(),
            is_scan_enabled: true,
            is_artifact_uploaded: false,
            plugin_registry_artifact_details: Some(HashMap::from([(
                "quay.io".to_string(),
                vec!["quay.io/acme/web:abc123".to_string()],
            )])),
            user_id: 1,
        };

        let json = serde_json::to_string(&event).unwrap();
        let decoded: CiCompleteEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
    }
}
