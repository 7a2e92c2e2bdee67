//! Helm release bridge backend.

use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET;
use crate::config::endpoint_url;
use crate::error::{DriverError, DriverResult};
use crate::helm::HelmDriverConfig;
use crate::http::{authorized, build_client, failure_from_response};
use crate::release::{
    AppIdentifier, AppStatus, HealthStatus, InstallRequest, InstallResult, ReleaseDriver,
    ReleaseStatus, SyncResult,
};

/// Release driver backed by the Helm release bridge.
///
/// The bridge fronts the cluster's Helm releases with a small REST API. Helm
/// has no sync concept; releases converge through install/upgrade requests,
/// so [`ReleaseDriver::sync`] reports a skipped sync.
pub struct HelmDriver {
    http: Client,
    config: HelmDriverConfig,
}

impl HelmDriver {
    /// Creates a new Helm driver.
    pub fn new(config: HelmDriverConfig) -> DriverResult<Self> {
        config.validate()?;
        let http = build_client(config.timeout())?;
        Ok(Self { http, config })
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        authorized(self.http.request(method, url), self.config.token())
    }

    fn release_url(&self, app: &AppIdentifier, suffix: &str) -> String {
        endpoint_url(
            self.config.base_url(),
            &format!(
                "api/v1/releases/{}/{}/{}",
                app.namespace, app.release_name, suffix
            ),
        )
    }
}

impl fmt::Debug for HelmDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelmDriver")
            .field("base_url", &self.config.base_url())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ReleaseDriver for HelmDriver {
    fn driver_name(&self) -> &'static str {
        "helm"
    }

    async fn status(&self, app: &AppIdentifier) -> DriverResult<AppStatus> {
        let url = self.release_url(app, "status");
        tracing::debug!(
            target: TRACING_TARGET,
            app = %app,
            "Fetching helm release status"
        );

        let response = self.request(Method::GET, url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(DriverError::release_not_found(app.release_name.clone()));
        }
        if !response.status().is_success() {
            return Err(failure_from_response(response).await);
        }

        let raw: HelmStatusResponse = response.json().await?;
        Ok(raw.into_status())
    }

    async fn sync(&self, app: &AppIdentifier) -> DriverResult<SyncResult> {
        tracing::debug!(
            target: TRACING_TARGET,
            app = %app,
            "Helm releases have no sync operation"
        );
        Ok(SyncResult::skipped(
            "helm releases converge through install requests",
        ))
    }

    async fn install(&self, request: &InstallRequest) -> DriverResult<InstallResult> {
        let url = self.release_url(&request.app, "upgrade");
        tracing::debug!(
            target: TRACING_TARGET,
            app = %request.app,
            image = %request.image,
            "Submitting helm upgrade request"
        );

        let payload = HelmUpgradePayload::from_request(request);
        let response = self
            .request(Method::POST, url)
            .json(&payload)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(failure_from_response(response).await);
        }

        let raw: HelmUpgradeResponse = response.json().await?;
        Ok(InstallResult {
            release_name: request.app.release_name.clone(),
            revision: raw.revision,
            message: raw.message,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HelmStatusResponse {
    release_status: String,
    application_status: String,
    #[serde(default)]
    last_deployed: Option<jiff::Timestamp>,
    #[serde(default)]
    description: Option<String>,
}

impl HelmStatusResponse {
    fn into_status(self) -> AppStatus {
        AppStatus {
            health: self
                .application_status
                .parse()
                .unwrap_or(HealthStatus::Unknown),
            release_status: self
                .release_status
                .parse()
                .unwrap_or(ReleaseStatus::Unknown),
            sync_status: None,
            operation_phase: None,
            synced_revision: None,
            last_deployed_at: self.last_deployed,
            description: self.description,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HelmUpgradePayload<'a> {
    image: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_digest: Option<&'a str>,
    values_override: &'a serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    chart_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chart_version: Option<&'a str>,
}

impl<'a> HelmUpgradePayload<'a> {
    fn from_request(request: &'a InstallRequest) -> Self {
        Self {
            image: &request.image,
            image_digest: request.image_digest.as_deref(),
            values_override: &request.values_override,
            chart_name: request.chart_name.as_deref(),
            chart_version: request.chart_version.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HelmUpgradeResponse {
    #[serde(default)]
    revision: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let raw: HelmStatusResponse = serde_json::from_value(serde_json::json!({
            "releaseStatus": "deployed",
            "applicationStatus": "Healthy",
            "lastDeployed": "2026-08-01T10:15:00Z",
            "description": "Upgrade complete"
        }))
        .unwrap();

        let status = raw.into_status();
        assert!(status.is_deployed_and_healthy());
        assert!(status.last_deployed_at.is_some());
        assert_eq!(status.description.as_deref(), Some("Upgrade complete"));
    }

    #[test]
    fn test_unrecognized_statuses_map_to_unknown() {
        let raw: HelmStatusResponse = serde_json::from_value(serde_json::json!({
            "releaseStatus": "uninstalling",
            "applicationStatus": "Terminating"
        }))
        .unwrap();

        let status = raw.into_status();
        assert_eq!(status.release_status, ReleaseStatus::Unknown);
        assert_eq!(status.health, HealthStatus::Unknown);
    }

    #[tokio::test]
    async fn test_sync_is_skipped() {
        let driver = HelmDriver::new(HelmDriverConfig::new("http://helm:8080")).unwrap();
        let app = AppIdentifier::new(1, 2, "orders-prod", "prod");

        let result = driver.sync(&app).await.unwrap();
        assert!(!result.triggered);
    }
}
