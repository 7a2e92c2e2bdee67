//! Release driver configuration types.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

// Re-export configs from backend modules
pub use crate::argocd::ArgoCdDriverConfig;
pub use crate::flux::FluxDriverConfig;
pub use crate::helm::HelmDriverConfig;

use crate::error::{DriverError, DriverResult};

/// Default request timeout for driver calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Returns the default user agent string for driver HTTP clients.
pub(crate) fn default_user_agent() -> String {
    format!("conveyor/{}", env!("CARGO_PKG_VERSION"))
}

/// Validates that a driver endpoint is an absolute http(s) URL.
pub(crate) fn validate_endpoint(url: &str) -> DriverResult<()> {
    if url.is_empty() {
        return Err(DriverError::invalid_config("driver URL cannot be empty"));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(DriverError::invalid_config(format!(
            "driver URL must start with http:// or https://, got: {url}"
        )));
    }
    Ok(())
}

/// Joins a driver endpoint with an API path, tolerating trailing slashes.
pub(crate) fn endpoint_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Aggregated configuration for all release backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct DriverConfig {
    /// Helm release bridge.
    #[cfg_attr(feature = "config", command(flatten))]
    pub helm: HelmDriverConfig,

    /// Argo CD application API.
    #[cfg_attr(feature = "config", command(flatten))]
    pub argocd: ArgoCdDriverConfig,

    /// Flux kustomization bridge.
    #[cfg_attr(feature = "config", command(flatten))]
    pub flux: FluxDriverConfig,
}

impl DriverConfig {
    /// Creates a configuration from the three backend endpoints.
    pub fn new(
        helm_url: impl Into<String>,
        argocd_url: impl Into<String>,
        flux_url: impl Into<String>,
    ) -> Self {
        Self {
            helm: HelmDriverConfig::new(helm_url),
            argocd: ArgoCdDriverConfig::new(argocd_url),
            flux: FluxDriverConfig::new(flux_url),
        }
    }

    /// Validates every backend configuration.
    pub fn validate(&self) -> DriverResult<()> {
        self.helm.validate()?;
        self.argocd.validate()?;
        self.flux.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_join() {
        assert_eq!(
            endpoint_url("http://helm:8080", "api/v1/releases"),
            "http://helm:8080/api/v1/releases"
        );
        assert_eq!(
            endpoint_url("http://helm:8080/", "/api/v1/releases"),
            "http://helm:8080/api/v1/releases"
        );
    }

    #[test]
    fn test_endpoint_validation() {
        assert!(validate_endpoint("http://helm:8080").is_ok());
        assert!(validate_endpoint("https://argocd.internal").is_ok());
        assert!(validate_endpoint("").is_err());
        assert!(validate_endpoint("helm:8080").is_err());
    }

    #[test]
    fn test_aggregate_validation() {
        let config = DriverConfig::new(
            "http://helm:8080",
            "http://argocd:8080",
            "http://flux:8080",
        );
        assert!(config.validate().is_ok());

        let mut config = config;
        config.argocd.argocd_driver_url = "argocd:8080".to_owned();
        assert!(config.validate().is_err());
    }
}
