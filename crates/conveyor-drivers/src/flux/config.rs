//! Flux kustomization bridge configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_TIMEOUT, validate_endpoint};
use crate::error::DriverResult;

/// Configuration for the Flux kustomization bridge client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct FluxDriverConfig {
    /// Base URL of the Flux kustomization bridge
    #[cfg_attr(
        feature = "config",
        arg(long = "flux-driver-url", env = "FLUX_DRIVER_URL")
    )]
    pub flux_driver_url: String,

    /// Bearer token for the bridge API (optional)
    #[cfg_attr(
        feature = "config",
        arg(long = "flux-driver-token", env = "FLUX_DRIVER_TOKEN")
    )]
    pub flux_driver_token: Option<String>,

    /// Request timeout in seconds (optional)
    #[cfg_attr(
        feature = "config",
        arg(long = "flux-driver-timeout", env = "FLUX_DRIVER_TIMEOUT_SECS")
    )]
    pub flux_driver_timeout_secs: Option<u64>,
}

impl FluxDriverConfig {
    /// Creates a new configuration for the given endpoint.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            flux_driver_url: url.into(),
            flux_driver_token: None,
            flux_driver_timeout_secs: None,
        }
    }

    /// Returns the base URL of the bridge.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.flux_driver_url
    }

    /// Returns the bearer token, if configured.
    #[inline]
    pub fn token(&self) -> Option<&str> {
        self.flux_driver_token.as_deref()
    }

    /// Returns the request timeout, using the default when not set.
    pub fn timeout(&self) -> Duration {
        self.flux_driver_timeout_secs
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs)
    }

    /// Sets the bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.flux_driver_token = Some(token.into());
        self
    }

    /// Sets the request timeout in seconds.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.flux_driver_timeout_secs = Some(secs);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DriverResult<()> {
        validate_endpoint(&self.flux_driver_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout() {
        let config = FluxDriverConfig::new("http://flux:8080");
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_validation() {
        assert!(FluxDriverConfig::new("http://flux:8080").validate().is_ok());
        assert!(FluxDriverConfig::new("ftp://flux:8080").validate().is_err());
    }
}
