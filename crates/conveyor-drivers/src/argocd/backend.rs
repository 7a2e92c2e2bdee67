//! Argo CD application API backend.

use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET;
use crate::argocd::ArgoCdDriverConfig;
use crate::config::endpoint_url;
use crate::error::{DriverError, DriverResult};
use crate::http::{authorized, build_client, failure_from_response};
use crate::release::{
    AppIdentifier, AppStatus, HealthStatus, InstallRequest, InstallResult, OperationPhase,
    ReleaseDriver, ReleaseStatus, SyncResult, SyncStatus,
};

/// Release driver backed by the Argo CD application API.
///
/// Status fetches request a refresh so the reconciler sees live cluster
/// state rather than the controller's cache.
pub struct ArgoCdDriver {
    http: Client,
    config: ArgoCdDriverConfig,
}

impl ArgoCdDriver {
    /// Creates a new Argo CD driver.
    pub fn new(config: ArgoCdDriverConfig) -> DriverResult<Self> {
        config.validate()?;
        let http = build_client(config.timeout())?;
        Ok(Self { http, config })
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        authorized(self.http.request(method, url), self.config.token())
    }

    fn application_url(&self, app: &AppIdentifier, suffix: Option<&str>) -> String {
        let path = match suffix {
            Some(suffix) => format!("api/v1/applications/{}/{}", app.release_name, suffix),
            None => format!("api/v1/applications/{}", app.release_name),
        };
        endpoint_url(self.config.base_url(), &path)
    }

    async fn fetch_application(&self, app: &AppIdentifier) -> DriverResult<ArgoApplication> {
        let url = self.application_url(app, None);
        let response = self
            .request(Method::GET, url)
            .query(&[("refresh", "normal")])
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(DriverError::release_not_found(app.release_name.clone()));
        }
        if !response.status().is_success() {
            return Err(failure_from_response(response).await);
        }
        Ok(response.json().await?)
    }
}

impl fmt::Debug for ArgoCdDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgoCdDriver")
            .field("base_url", &self.config.base_url())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ReleaseDriver for ArgoCdDriver {
    fn driver_name(&self) -> &'static str {
        "argocd"
    }

    async fn status(&self, app: &AppIdentifier) -> DriverResult<AppStatus> {
        tracing::debug!(
            target: TRACING_TARGET,
            app = %app,
            "Fetching argocd application"
        );
        let application = self.fetch_application(app).await?;
        Ok(application.into_status())
    }

    async fn sync(&self, app: &AppIdentifier) -> DriverResult<SyncResult> {
        let url = self.application_url(app, Some("sync"));
        tracing::debug!(
            target: TRACING_TARGET,
            app = %app,
            "Requesting argocd application sync"
        );

        let payload = ArgoSyncPayload { prune: false };
        let response = self
            .request(Method::POST, url)
            .json(&payload)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(DriverError::release_not_found(app.release_name.clone()));
        }
        if !response.status().is_success() {
            return Err(failure_from_response(response).await);
        }

        let application: ArgoApplication = response.json().await?;
        Ok(SyncResult::triggered(application.status.sync.revision))
    }

    async fn install(&self, request: &InstallRequest) -> DriverResult<InstallResult> {
        let url = self.application_url(&request.app, Some("deploy"));
        tracing::debug!(
            target: TRACING_TARGET,
            app = %request.app,
            image = %request.image,
            "Submitting argocd deploy request"
        );

        let payload = ArgoDeployPayload::from_request(request);
        let response = self
            .request(Method::POST, url)
            .json(&payload)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(failure_from_response(response).await);
        }

        let raw: ArgoDeployResponse = response.json().await?;
        Ok(InstallResult {
            release_name: request.app.release_name.clone(),
            revision: raw.revision,
            message: raw.message,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct ArgoApplication {
    #[serde(default)]
    status: ArgoApplicationStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArgoApplicationStatus {
    #[serde(default)]
    health: ArgoHealth,
    #[serde(default)]
    sync: ArgoSync,
    #[serde(default)]
    operation_state: Option<ArgoOperationState>,
}

#[derive(Debug, Default, Deserialize)]
struct ArgoHealth {
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ArgoSync {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    revision: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArgoOperationState {
    #[serde(default)]
    phase: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    finished_at: Option<jiff::Timestamp>,
    #[serde(default)]
    sync_result: Option<ArgoOperationSyncResult>,
}

#[derive(Debug, Deserialize)]
struct ArgoOperationSyncResult {
    #[serde(default)]
    revision: Option<String>,
}

impl ArgoApplication {
    fn into_status(self) -> AppStatus {
        let ArgoApplicationStatus {
            health,
            sync,
            operation_state,
        } = self.status;

        let operation_phase = operation_state
            .as_ref()
            .and_then(|op| op.phase.as_deref())
            .and_then(|phase| phase.parse::<OperationPhase>().ok());
        let release_status = match operation_phase {
            Some(phase) if phase.is_successful() => ReleaseStatus::Deployed,
            Some(phase) if phase.is_failed() => ReleaseStatus::Failed,
            _ => ReleaseStatus::Unknown,
        };

        // The operation's synced revision is authoritative; the target
        // revision from the sync block only fills in while no operation
        // has run yet.
        let synced_revision = operation_state
            .as_ref()
            .and_then(|op| op.sync_result.as_ref())
            .and_then(|result| result.revision.clone())
            .or(sync.revision);

        AppStatus {
            health: health
                .status
                .as_deref()
                .and_then(|status| status.parse().ok())
                .unwrap_or(HealthStatus::Unknown),
            release_status,
            sync_status: Some(
                sync.status
                    .as_deref()
                    .and_then(|status| status.parse().ok())
                    .unwrap_or(SyncStatus::Unknown),
            ),
            operation_phase,
            synced_revision,
            last_deployed_at: operation_state.as_ref().and_then(|op| op.finished_at),
            description: operation_state.and_then(|op| op.message),
        }
    }
}

#[derive(Debug, Serialize)]
struct ArgoSyncPayload {
    prune: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ArgoDeployPayload<'a> {
    image: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_digest: Option<&'a str>,
    values_override: &'a serde_json::Value,
}

impl<'a> ArgoDeployPayload<'a> {
    fn from_request(request: &'a InstallRequest) -> Self {
        Self {
            image: &request.image,
            image_digest: request.image_digest.as_deref(),
            values_override: &request.values_override,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArgoDeployResponse {
    #[serde(default)]
    revision: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_operation_mapping() {
        let raw: ArgoApplication = serde_json::from_value(serde_json::json!({
            "status": {
                "health": {"status": "Healthy"},
                "sync": {"status": "Synced", "revision": "aaaa111122223333"},
                "operationState": {
                    "phase": "Succeeded",
                    "message": "successfully synced",
                    "finishedAt": "2026-08-01T10:15:00Z",
                    "syncResult": {"revision": "5e66fa1f6c3b1f0a"}
                }
            }
        }))
        .unwrap();

        let status = raw.into_status();
        assert!(status.is_healthy());
        assert!(status.operation_succeeded());
        assert_eq!(status.release_status, ReleaseStatus::Deployed);
        assert_eq!(status.sync_status, Some(SyncStatus::Synced));
        assert_eq!(status.synced_revision.as_deref(), Some("5e66fa1f6c3b1f0a"));
        assert!(status.last_deployed_at.is_some());
    }

    #[test]
    fn test_failed_operation_mapping() {
        let raw: ArgoApplication = serde_json::from_value(serde_json::json!({
            "status": {
                "health": {"status": "Degraded"},
                "sync": {"status": "OutOfSync"},
                "operationState": {"phase": "Failed", "message": "one or more objects failed"}
            }
        }))
        .unwrap();

        let status = raw.into_status();
        assert_eq!(status.release_status, ReleaseStatus::Failed);
        assert_eq!(status.health, HealthStatus::Degraded);
        assert_eq!(
            status.description.as_deref(),
            Some("one or more objects failed")
        );
    }

    #[test]
    fn test_empty_application_defaults() {
        let raw: ArgoApplication = serde_json::from_value(serde_json::json!({})).unwrap();

        let status = raw.into_status();
        assert_eq!(status.health, HealthStatus::Unknown);
        assert_eq!(status.release_status, ReleaseStatus::Unknown);
        assert_eq!(status.sync_status, Some(SyncStatus::Unknown));
        assert!(status.operation_phase.is_none());
        assert!(status.synced_revision.is_none());
    }
}
