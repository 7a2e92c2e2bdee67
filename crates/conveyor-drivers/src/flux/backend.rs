//! Flux kustomization bridge backend.

use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET;
use crate::config::endpoint_url;
use crate::error::{DriverError, DriverResult};
use crate::flux::FluxDriverConfig;
use crate::http::{authorized, build_client, failure_from_response};
use crate::release::{
    AppIdentifier, AppStatus, HealthStatus, InstallRequest, InstallResult, ReleaseDriver,
    ReleaseStatus, SyncResult,
};

/// Release driver backed by the Flux kustomization bridge.
///
/// Flux reconciles on an interval; [`ReleaseDriver::sync`] requests an
/// immediate reconcile through the bridge instead of waiting for the next
/// one. Applied revisions come back in Flux's `branch@sha1:hash` form and
/// are reduced to the bare hash, which may be abbreviated.
pub struct FluxDriver {
    http: Client,
    config: FluxDriverConfig,
}

impl FluxDriver {
    /// Creates a new Flux driver.
    pub fn new(config: FluxDriverConfig) -> DriverResult<Self> {
        config.validate()?;
        let http = build_client(config.timeout())?;
        Ok(Self { http, config })
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        authorized(self.http.request(method, url), self.config.token())
    }

    fn kustomization_url(&self, app: &AppIdentifier, suffix: Option<&str>) -> String {
        let path = match suffix {
            Some(suffix) => format!(
                "api/v1/kustomizations/{}/{}/{}",
                app.namespace, app.release_name, suffix
            ),
            None => format!(
                "api/v1/kustomizations/{}/{}",
                app.namespace, app.release_name
            ),
        };
        endpoint_url(self.config.base_url(), &path)
    }
}

impl fmt::Debug for FluxDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FluxDriver")
            .field("base_url", &self.config.base_url())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ReleaseDriver for FluxDriver {
    fn driver_name(&self) -> &'static str {
        "flux"
    }

    async fn status(&self, app: &AppIdentifier) -> DriverResult<AppStatus> {
        let url = self.kustomization_url(app, None);
        tracing::debug!(
            target: TRACING_TARGET,
            app = %app,
            "Fetching flux kustomization"
        );

        let response = self.request(Method::GET, url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(DriverError::release_not_found(app.release_name.clone()));
        }
        if !response.status().is_success() {
            return Err(failure_from_response(response).await);
        }

        let raw: FluxKustomizationResponse = response.json().await?;
        Ok(raw.into_status())
    }

    async fn sync(&self, app: &AppIdentifier) -> DriverResult<SyncResult> {
        let url = self.kustomization_url(app, Some("reconcile"));
        tracing::debug!(
            target: TRACING_TARGET,
            app = %app,
            "Requesting flux reconcile"
        );

        let response = self.request(Method::POST, url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(DriverError::release_not_found(app.release_name.clone()));
        }
        if !response.status().is_success() {
            return Err(failure_from_response(response).await);
        }

        let raw: FluxReconcileResponse = response.json().await?;
        let revision = raw.revision.as_deref().map(parse_flux_revision);
        Ok(SyncResult::triggered(revision.map(str::to_owned)))
    }

    async fn install(&self, request: &InstallRequest) -> DriverResult<InstallResult> {
        let url = self.kustomization_url(&request.app, Some("deploy"));
        tracing::debug!(
            target: TRACING_TARGET,
            app = %request.app,
            image = %request.image,
            "Submitting flux deploy request"
        );

        let payload = FluxDeployPayload::from_request(request);
        let response = self
            .request(Method::POST, url)
            .json(&payload)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(failure_from_response(response).await);
        }

        let raw: FluxReconcileResponse = response.json().await?;
        Ok(InstallResult {
            release_name: request.app.release_name.clone(),
            revision: raw.revision.as_deref().map(parse_flux_revision).map(str::to_owned),
            message: raw.message,
        })
    }
}

/// Reduces a Flux revision to the bare commit hash.
///
/// Handles both the `branch@sha1:hash` form and the legacy `branch/hash`
/// form; a bare hash passes through unchanged.
fn parse_flux_revision(revision: &str) -> &str {
    let tail = revision.rsplit(':').next().unwrap_or(revision);
    tail.rsplit('/').next().unwrap_or(tail)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FluxKustomizationResponse {
    #[serde(default)]
    ready: Option<bool>,
    #[serde(default)]
    suspended: bool,
    #[serde(default)]
    reconciling: bool,
    #[serde(default)]
    last_applied_revision: Option<String>,
    #[serde(default)]
    last_handled_reconcile_at: Option<jiff::Timestamp>,
    #[serde(default)]
    message: Option<String>,
}

impl FluxKustomizationResponse {
    fn into_status(self) -> AppStatus {
        let health = if self.suspended {
            HealthStatus::Suspended
        } else {
            match self.ready {
                Some(true) => HealthStatus::Healthy,
                Some(false) if self.reconciling => HealthStatus::Progressing,
                Some(false) => HealthStatus::Degraded,
                None => HealthStatus::Unknown,
            }
        };
        let release_status = match self.ready {
            Some(true) => ReleaseStatus::Deployed,
            Some(false) if self.reconciling || self.suspended => ReleaseStatus::Unknown,
            Some(false) => ReleaseStatus::Failed,
            None => ReleaseStatus::Unknown,
        };

        AppStatus {
            health,
            release_status,
            sync_status: None,
            operation_phase: None,
            synced_revision: self
                .last_applied_revision
                .as_deref()
                .map(parse_flux_revision)
                .map(str::to_owned),
            last_deployed_at: self.last_handled_reconcile_at,
            description: self.message,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FluxDeployPayload<'a> {
    image: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_digest: Option<&'a str>,
    values_override: &'a serde_json::Value,
}

impl<'a> FluxDeployPayload<'a> {
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
struct FluxReconcileResponse {
    #[serde(default)]
    revision: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flux_revision_forms() {
        assert_eq!(
            parse_flux_revision("main@sha1:5e66fa1f6c3b1f0a"),
            "5e66fa1f6c3b1f0a"
        );
        assert_eq!(parse_flux_revision("main/5e66fa1"), "5e66fa1");
        assert_eq!(parse_flux_revision("5e66fa1f6c3b1f0a"), "5e66fa1f6c3b1f0a");
    }

    #[test]
    fn test_ready_kustomization_mapping() {
        let raw: FluxKustomizationResponse = serde_json::from_value(serde_json::json!({
            "ready": true,
            "lastAppliedRevision": "main@sha1:5e66fa1f6c3b1f0a",
            "message": "Applied revision: main@sha1:5e66fa1f6c3b1f0a"
        }))
        .unwrap();

        let status = raw.into_status();
        assert!(status.is_deployed_and_healthy());
        assert_eq!(status.synced_revision.as_deref(), Some("5e66fa1f6c3b1f0a"));
    }

    #[test]
    fn test_not_ready_kustomization_mapping() {
        let raw: FluxKustomizationResponse = serde_json::from_value(serde_json::json!({
            "ready": false,
            "message": "health check failed"
        }))
        .unwrap();

        let status = raw.into_status();
        assert_eq!(status.health, HealthStatus::Degraded);
        assert_eq!(status.release_status, ReleaseStatus::Failed);
    }

    #[test]
    fn test_reconciling_kustomization_mapping() {
        let raw: FluxKustomizationResponse = serde_json::from_value(serde_json::json!({
            "ready": false,
            "reconciling": true
        }))
        .unwrap();

        let status = raw.into_status();
        assert_eq!(status.health, HealthStatus::Progressing);
        assert_eq!(status.release_status, ReleaseStatus::Unknown);
    }

    #[test]
    fn test_suspended_kustomization_mapping() {
        let raw: FluxKustomizationResponse = serde_json::from_value(serde_json::json!({
            "ready": false,
            "suspended": true
        }))
        .unwrap();

        let status = raw.into_status();
        assert_eq!(status.health, HealthStatus::Suspended);
        assert_eq!(status.release_status, ReleaseStatus::Unknown);
    }
}
