//! Argo CD application API configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_TIMEOUT, validate_endpoint};
use crate::error::DriverResult;

/// Configuration for the Argo CD application API client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ArgoCdDriverConfig {
    /// Base URL of the Argo CD API server
    #[cfg_attr(
        feature = "config",
        arg(long = "argocd-driver-url", env = "ARGOCD_DRIVER_URL")
    )]
    pub argocd_driver_url: String,

    /// Bearer token for the API (optional)
    #[cfg_attr(
        feature = "config",
        arg(long = "argocd-driver-token", env = "ARGOCD_DRIVER_TOKEN")
    )]
    pub argocd_driver_token: Option<String>,

    /// Request timeout in seconds (optional)
    #[cfg_attr(
        feature = "config",
        arg(long = "argocd-driver-timeout", env = "ARGOCD_DRIVER_TIMEOUT_SECS")
    )]
    pub argocd_driver_timeout_secs: Option<u64>,
}

impl ArgoCdDriverConfig {
    /// Creates a new configuration for the given endpoint.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            argocd_driver_url: url.into(),
            argocd_driver_token: None,
            argocd_driver_timeout_secs: None,
        }
    }

    /// Returns the base URL of the API server.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.argocd_driver_url
    }

    /// Returns the bearer token, if configured.
    #[inline]
    pub fn token(&self) -> Option<&str> {
        self.argocd_driver_token.as_deref()
    }

    /// Returns the request timeout, using the default when not set.
    pub fn timeout(&self) -> Duration {
        self.argocd_driver_timeout_secs
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs)
    }

    /// Sets the bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.argocd_driver_token = Some(token.into());
        self
    }

    /// Sets the request timeout in seconds.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.argocd_driver_timeout_secs = Some(secs);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DriverResult<()> {
        validate_endpoint(&self.argocd_driver_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout() {
        let config = ArgoCdDriverConfig::new("http://argocd:8080");
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_validation() {
        assert!(
            ArgoCdDriverConfig::new("https://argocd.internal")
                .validate()
                .is_ok()
        );
        assert!(ArgoCdDriverConfig::new("").validate().is_err());
    }
}
