//! Deployment trigger request payload.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Asynchronous deployment request consumed by the trigger worker.
///
/// Accepting a deployment creates the workflow rows synchronously and then
/// publishes one of these. The worker picks it up, drives the release
/// backend, and records the outcome. The runner referenced by `wfr_id` is
/// the unit of de-duplication: redelivered requests for an already finished
/// runner are acknowledged without side effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct DeployRequest {
    /// Unique id of this request, for correlating logs across services.
    pub request_id: Uuid,
    /// Target CD pipeline.
    pub pipeline_id: i64,
    /// Application the pipeline belongs to.
    pub app_id: i64,
    /// Environment the pipeline deploys into.
    pub env_id: i64,
    /// Image artifact to deploy.
    pub ci_artifact_id: i64,
    /// Workflow grouping row for this deployment.
    pub cd_workflow_id: i64,
    /// Workflow runner created for the deploy stage.
    pub wfr_id: i64,
    /// User who initiated the deployment.
    pub user_id: i64,
    /// Release backend in charge: `"gitops"`, `"helm"`, or `"flux"`.
    ///
    /// Informational only. The worker re-reads the pipeline row and
    /// dispatches on the persisted value.
    pub deployment_app_type: String,
    /// Request an immediate sync even when auto-sync is enabled.
    pub force_sync: bool,
    /// When the request was accepted.
    pub triggered_at: Timestamp,
}

impl DeployRequest {
    /// Message id for JetStream de-duplication, keyed on the runner.
    #[must_use]
    pub fn message_id(&self) -> String {
        format!("cd-wfr-{}", self.wfr_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> DeployRequest {
        DeployRequest {
            request_id: Uuid::new_v4(),
            pipeline_id: 42,
            app_id: 7,
            env_id: 3,
            ci_artifact_id: 1001,
            cd_workflow_id: 555,
            wfr_id: 777,
            user_id: 1,
            deployment_app_type: "helm".to_string(),
            force_sync: false,
            triggered_at: Timestamp::now(),
        }
    }

    #[test]
    fn test_message_id_keyed_on_runner() {
        let request = sample_request();
        assert_eq!(request.message_id(), "cd-wfr-777");
    }

    #[test]
    fn test_deploy_request_roundtrip() {
        let request = sample_request();
        let json = serde_json::to_string(&request).unwrap();
        let decoded: DeployRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, request);
    }
}
