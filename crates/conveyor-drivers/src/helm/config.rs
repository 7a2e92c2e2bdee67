//! Helm release bridge configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_TIMEOUT, validate_endpoint};
use crate::error::DriverResult;

/// Configuration for the Helm release bridge client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct HelmDriverConfig {
    /// Base URL of the Helm release bridge
    #[cfg_attr(
        feature = "config",
        arg(long = "helm-driver-url", env = "HELM_DRIVER_URL")
    )]
    pub helm_driver_url: String,

    /// Bearer token for the bridge API (optional)
    #[cfg_attr(
        feature = "config",
        arg(long = "helm-driver-token", env = "HELM_DRIVER_TOKEN")
    )]
    pub helm_driver_token: Option<String>,

    /// Request timeout in seconds (optional)
    #[cfg_attr(
        feature = "config",
        arg(long = "helm-driver-timeout", env = "HELM_DRIVER_TIMEOUT_SECS")
    )]
    pub helm_driver_timeout_secs: Option<u64>,
}

impl HelmDriverConfig {
    /// Creates a new configuration for the given endpoint.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            helm_driver_url: url.into(),
            helm_driver_token: None,
            helm_driver_timeout_secs: None,
        }
    }

    /// Returns the base URL of the bridge.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.helm_driver_url
    }

    /// Returns the bearer token, if configured.
    #[inline]
    pub fn token(&self) -> Option<&str> {
        self.helm_driver_token.as_deref()
    }

    /// Returns the request timeout, using the default when not set.
    pub fn timeout(&self) -> Duration {
        self.helm_driver_timeout_secs
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs)
    }

    /// Sets the bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.helm_driver_token = Some(token.into());
        self
    }

    /// Sets the request timeout in seconds.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.helm_driver_timeout_secs = Some(secs);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DriverResult<()> {
        validate_endpoint(&self.helm_driver_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout() {
        let config = HelmDriverConfig::new("http://helm:8080");
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(config.with_timeout_secs(5).timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_validation() {
        assert!(HelmDriverConfig::new("http://helm:8080").validate().is_ok());
        assert!(HelmDriverConfig::new("helm:8080").validate().is_err());
    }
}
