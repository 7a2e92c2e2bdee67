//! Driver registry dispatching on the deployment app type.

use conveyor_postgres::types::DeploymentAppType;

use crate::TRACING_TARGET;
use crate::argocd::ArgoCdDriver;
use crate::config::DriverConfig;
use crate::error::DriverResult;
use crate::flux::FluxDriver;
use crate::helm::HelmDriver;
use crate::release::{
    AppIdentifier, AppStatus, InstallRequest, InstallResult, ReleaseDriver, SyncResult,
};

/// Unified entry point over the release backends.
///
/// Holds one driver per deployment app type and routes every call to the
/// backend serving the pipeline's app type.
pub struct DriverRegistry {
    helm: Box<dyn ReleaseDriver>,
    argocd: Box<dyn ReleaseDriver>,
    flux: Box<dyn ReleaseDriver>,
}

impl DriverRegistry {
    /// Creates a registry from backend configurations.
    pub fn new(config: DriverConfig) -> DriverResult<Self> {
        let registry = Self::from_drivers(
            Box::new(HelmDriver::new(config.helm)?),
            Box::new(ArgoCdDriver::new(config.argocd)?),
            Box::new(FluxDriver::new(config.flux)?),
        );

        tracing::info!(
            target: TRACING_TARGET,
            "Release drivers initialized"
        );

        Ok(registry)
    }

    /// Creates a registry from already-built drivers.
    pub fn from_drivers(
        helm: Box<dyn ReleaseDriver>,
        argocd: Box<dyn ReleaseDriver>,
        flux: Box<dyn ReleaseDriver>,
    ) -> Self {
        Self { helm, argocd, flux }
    }

    /// Returns the driver serving the given deployment app type.
    pub fn driver_for(&self, app_type: DeploymentAppType) -> &dyn ReleaseDriver {
        match app_type {
            DeploymentAppType::Helm => self.helm.as_ref(),
            DeploymentAppType::Gitops => self.argocd.as_ref(),
            DeploymentAppType::Flux => self.flux.as_ref(),
        }
    }

    /// Fetches the live release and application status.
    pub async fn status(
        &self,
        app_type: DeploymentAppType,
        app: &AppIdentifier,
    ) -> DriverResult<AppStatus> {
        let driver = self.driver_for(app_type);
        tracing::debug!(
            target: TRACING_TARGET,
            driver = driver.driver_name(),
            app = %app,
            "Fetching application status"
        );
        driver.status(app).await
    }

    /// Requests the backend to re-sync the application.
    pub async fn sync(
        &self,
        app_type: DeploymentAppType,
        app: &AppIdentifier,
    ) -> DriverResult<SyncResult> {
        let driver = self.driver_for(app_type);
        tracing::debug!(
            target: TRACING_TARGET,
            driver = driver.driver_name(),
            app = %app,
            "Requesting application sync"
        );
        driver.sync(app).await
    }

    /// Submits an install or upgrade request.
    pub async fn install(
        &self,
        app_type: DeploymentAppType,
        request: &InstallRequest,
    ) -> DriverResult<InstallResult> {
        let driver = self.driver_for(app_type);
        tracing::debug!(
            target: TRACING_TARGET,
            driver = driver.driver_name(),
            app = %request.app,
            image = %request.image,
            "Submitting install request"
        );
        driver.install(request).await
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("helm", &self.helm.driver_name())
            .field("argocd", &self.argocd.driver_name())
            .field("flux", &self.flux.driver_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::DriverError;
    use crate::release::{HealthStatus, ReleaseStatus};

    struct StaticDriver {
        name: &'static str,
        health: HealthStatus,
    }

    #[async_trait]
    impl ReleaseDriver for StaticDriver {
        fn driver_name(&self) -> &'static str {
            self.name
        }

        async fn status(&self, _app: &AppIdentifier) -> DriverResult<AppStatus> {
            Ok(AppStatus {
                health: self.health,
                release_status: ReleaseStatus::Deployed,
                sync_status: None,
                operation_phase: None,
                synced_revision: None,
                last_deployed_at: None,
                description: None,
            })
        }

        async fn sync(&self, _app: &AppIdentifier) -> DriverResult<SyncResult> {
            Ok(SyncResult::triggered(None))
        }

        async fn install(&self, _request: &InstallRequest) -> DriverResult<InstallResult> {
            Err(DriverError::reported_failure("install not scripted"))
        }
    }

    fn test_registry() -> DriverRegistry {
        DriverRegistry::from_drivers(
            Box::new(StaticDriver {
                name: "helm-test",
                health: HealthStatus::Healthy,
            }),
            Box::new(StaticDriver {
                name: "argocd-test",
                health: HealthStatus::Progressing,
            }),
            Box::new(StaticDriver {
                name: "flux-test",
                health: HealthStatus::Degraded,
            }),
        )
    }

    #[tokio::test]
    async fn test_dispatch_by_app_type() {
        let registry = test_registry();
        let app = AppIdentifier::new(1, 2, "orders-prod", "prod");

        let helm = registry.status(DeploymentAppType::Helm, &app).await.unwrap();
        assert_eq!(helm.health, HealthStatus::Healthy);

        let gitops = registry
            .status(DeploymentAppType::Gitops, &app)
            .await
            .unwrap();
        assert_eq!(gitops.health, HealthStatus::Progressing);

        let flux = registry.status(DeploymentAppType::Flux, &app).await.unwrap();
        assert_eq!(flux.health, HealthStatus::Degraded);
    }

    #[test]
    fn test_driver_for_names() {
        let registry = test_registry();
        assert_eq!(
            registry.driver_for(DeploymentAppType::Gitops).driver_name(),
            "argocd-test"
        );
        assert_eq!(
            format!("{registry:?}"),
            "DriverRegistry { helm: \"helm-test\", argocd: \"argocd-test\", flux: \"flux-test\" }"
        );
    }
}
