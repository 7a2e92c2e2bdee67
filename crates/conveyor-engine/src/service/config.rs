//! Engine configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use conveyor_drivers::DriverConfig;
use conveyor_nats::NatsConfig;
use conveyor_postgres::PgConfig;
use conveyor_postgres::types::DeploymentAppType;
use serde::{Deserialize, Serialize};

use crate::{EngineError, Result};

/// Default maximum concurrent jobs per worker.
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 10;
/// Default cap on automatic hook-stage retries per original attempt.
pub const DEFAULT_MAX_RUNNER_RETRIES: i64 = 3;
/// Default budget for a Helm install call, in minutes.
pub const DEFAULT_HELM_INSTALL_TIMEOUT_MINS: i64 = 6;
/// Default budget for a GitOps install call, in minutes.
pub const DEFAULT_ARGOCD_INSTALL_TIMEOUT_MINS: i64 = 3;
/// Default age a GitOps runner must reach before the Argo sweep picks it
/// up, in minutes.
pub const DEFAULT_ARGOCD_DEPLOYED_BEFORE_MINS: i64 = 30;
/// Default stall window after kubectl-apply before a deployment is
/// re-enqueued for status sync, in seconds.
pub const DEFAULT_ARGOCD_DEGRADATION_THRESHOLD_SECS: i64 = 600;
/// Default number of child pipelines triggered per CI fan-out batch.
pub const DEFAULT_CI_AUTO_TRIGGER_BATCH_SIZE: i64 = 5;
/// Default interval between Helm reconcile sweeps, in seconds.
pub const DEFAULT_HELM_SWEEP_INTERVAL_SECS: u64 = 120;
/// Default interval between Argo reconcile sweeps, in seconds.
pub const DEFAULT_ARGOCD_SWEEP_INTERVAL_SECS: u64 = 60;
/// Default interval between degradation sweeps, in seconds.
pub const DEFAULT_DEGRADATION_SWEEP_INTERVAL_SECS: u64 = 300;

/// Complete engine configuration.
///
/// Combines connection configuration for external services with the
/// behavior knobs of the trigger orchestrator, the reconciler, and the
/// propagator. This is the main configuration type passed to
/// [`EngineState::from_config`].
///
/// [`EngineState::from_config`]: super::EngineState::from_config
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct EngineConfig {
    /// Postgres database configuration.
    #[cfg_attr(feature = "config", command(flatten))]
    pub postgres: PgConfig,

    /// NATS configuration.
    #[cfg_attr(feature = "config", command(flatten))]
    pub nats: NatsConfig,

    /// Release driver configuration.
    #[cfg_attr(feature = "config", command(flatten))]
    pub drivers: DriverConfig,

    /// Whether to record deployment metrics.
    #[cfg_attr(
        feature = "config",
        arg(long = "expose-cd-metrics", env = "EXPOSE_CD_METRICS")
    )]
    #[serde(default)]
    pub expose_cd_metrics: bool,

    /// Whether failed hook stages are retried automatically.
    #[cfg_attr(
        feature = "config",
        arg(long = "workflow-retries-enabled", env = "WORKFLOW_RETRIES_ENABLED")
    )]
    #[serde(default)]
    pub workflow_retries_enabled: bool,

    /// Maximum automatic retries per original hook-stage attempt.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "max-cd-workflow-runner-retries",
            env = "MAX_CD_WORKFLOW_RUNNER_RETRIES",
            default_value_t = DEFAULT_MAX_RUNNER_RETRIES
        )
    )]
    #[serde(default = "default_max_runner_retries")]
    pub max_cd_workflow_runner_retries: i64,

    /// Budget for a Helm install call, in minutes.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "helm-install-request-timeout",
            env = "HELM_INSTALL_REQUEST_TIMEOUT_MINS",
            default_value_t = DEFAULT_HELM_INSTALL_TIMEOUT_MINS
        )
    )]
    #[serde(default = "default_helm_install_timeout_mins")]
    pub helm_install_request_timeout_mins: i64,

    /// Budget for a GitOps install call, in minutes.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "argocd-install-request-timeout",
            env = "ARGOCD_INSTALL_REQUEST_TIMEOUT_MINS",
            default_value_t = DEFAULT_ARGOCD_INSTALL_TIMEOUT_MINS
        )
    )]
    #[serde(default = "default_argocd_install_timeout_mins")]
    pub argocd_install_request_timeout_mins: i64,

    /// Whether Argo CD applications sync on their own.
    ///
    /// When disabled, the Argo sweep triggers one manual sync per stuck
    /// deployment.
    #[cfg_attr(
        feature = "config",
        arg(long = "argocd-auto-sync-enabled", env = "ARGOCD_AUTO_SYNC_ENABLED")
    )]
    #[serde(default)]
    pub argocd_auto_sync_enabled: bool,

    /// Age a GitOps runner must reach before the Argo sweep picks it up,
    /// in minutes.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "argocd-manual-sync-deployed-before",
            env = "ARGOCD_MANUAL_SYNC_DEPLOYED_BEFORE_MINS",
            default_value_t = DEFAULT_ARGOCD_DEPLOYED_BEFORE_MINS
        )
    )]
    #[serde(default = "default_argocd_deployed_before_mins")]
    pub argocd_manual_sync_deployed_before_mins: i64,

    /// Stall window after kubectl-apply before a deployment is re-enqueued
    /// for status sync, in seconds.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "argocd-degradation-threshold",
            env = "ARGOCD_DEGRADATION_THRESHOLD_SECS",
            default_value_t = DEFAULT_ARGOCD_DEGRADATION_THRESHOLD_SECS
        )
    )]
    #[serde(default = "default_argocd_degradation_threshold_secs")]
    pub argocd_degradation_threshold_secs: i64,

    /// Child pipelines triggered per CI fan-out batch.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "ci-auto-trigger-batch-size",
            env = "CI_AUTO_TRIGGER_BATCH_SIZE",
            default_value_t = DEFAULT_CI_AUTO_TRIGGER_BATCH_SIZE
        )
    )]
    #[serde(default = "default_ci_auto_trigger_batch_size")]
    pub ci_auto_trigger_batch_size: i64,

    /// Interval between Helm reconcile sweeps, in seconds.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "helm-sweep-interval",
            env = "HELM_SWEEP_INTERVAL_SECS",
            default_value_t = DEFAULT_HELM_SWEEP_INTERVAL_SECS
        )
    )]
    #[serde(default = "default_helm_sweep_interval_secs")]
    pub helm_sweep_interval_secs: u64,

    /// Interval between Argo reconcile sweeps, in seconds.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "argocd-sweep-interval",
            env = "ARGOCD_SWEEP_INTERVAL_SECS",
            default_value_t = DEFAULT_ARGOCD_SWEEP_INTERVAL_SECS
        )
    )]
    #[serde(default = "default_argocd_sweep_interval_secs")]
    pub argocd_sweep_interval_secs: u64,

    /// Interval between degradation sweeps, in seconds.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "degradation-sweep-interval",
            env = "DEGRADATION_SWEEP_INTERVAL_SECS",
            default_value_t = DEFAULT_DEGRADATION_SWEEP_INTERVAL_SECS
        )
    )]
    #[serde(default = "default_degradation_sweep_interval_secs")]
    pub degradation_sweep_interval_secs: u64,

    /// Maximum concurrent jobs a worker can process simultaneously.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "engine-max-concurrent-jobs",
            env = "ENGINE_MAX_CONCURRENT_JOBS",
            default_value_t = DEFAULT_MAX_CONCURRENT_JOBS
        )
    )]
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
}

fn default_max_runner_retries() -> i64 {
    DEFAULT_MAX_RUNNER_RETRIES
}

fn default_helm_install_timeout_mins() -> i64 {
    DEFAULT_HELM_INSTALL_TIMEOUT_MINS
}

fn default_argocd_install_timeout_mins() -> i64 {
    DEFAULT_ARGOCD_INSTALL_TIMEOUT_MINS
}

fn default_argocd_deployed_before_mins() -> i64 {
    DEFAULT_ARGOCD_DEPLOYED_BEFORE_MINS
}

fn default_argocd_degradation_threshold_secs() -> i64 {
    DEFAULT_ARGOCD_DEGRADATION_THRESHOLD_SECS
}

fn default_ci_auto_trigger_batch_size() -> i64 {
    DEFAULT_CI_AUTO_TRIGGER_BATCH_SIZE
}

fn default_helm_sweep_interval_secs() -> u64 {
    DEFAULT_HELM_SWEEP_INTERVAL_SECS
}

fn default_argocd_sweep_interval_secs() -> u64 {
    DEFAULT_ARGOCD_SWEEP_INTERVAL_SECS
}

fn default_degradation_sweep_interval_secs() -> u64 {
    DEFAULT_DEGRADATION_SWEEP_INTERVAL_SECS
}

fn default_max_concurrent_jobs() -> usize {
    DEFAULT_MAX_CONCURRENT_JOBS
}

impl EngineConfig {
    /// Creates a new engine configuration with default behavior knobs.
    pub fn new(postgres: PgConfig, nats: NatsConfig, drivers: DriverConfig) -> Self {
        Self {
            postgres,
            nats,
            drivers,
            expose_cd_metrics: false,
            workflow_retries_enabled: false,
            max_cd_workflow_runner_retries: DEFAULT_MAX_RUNNER_RETRIES,
            helm_install_request_timeout_mins: DEFAULT_HELM_INSTALL_TIMEOUT_MINS,
            argocd_install_request_timeout_mins: DEFAULT_ARGOCD_INSTALL_TIMEOUT_MINS,
            argocd_auto_sync_enabled: false,
            argocd_manual_sync_deployed_before_mins: DEFAULT_ARGOCD_DEPLOYED_BEFORE_MINS,
            argocd_degradation_threshold_secs: DEFAULT_ARGOCD_DEGRADATION_THRESHOLD_SECS,
            ci_auto_trigger_batch_size: DEFAULT_CI_AUTO_TRIGGER_BATCH_SIZE,
            helm_sweep_interval_secs: DEFAULT_HELM_SWEEP_INTERVAL_SECS,
            argocd_sweep_interval_secs: DEFAULT_ARGOCD_SWEEP_INTERVAL_SECS,
            degradation_sweep_interval_secs: DEFAULT_DEGRADATION_SWEEP_INTERVAL_SECS,
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
        }
    }

    /// Sets the concurrency limit.
    pub fn with_max_concurrent_jobs(mut self, max_concurrent_jobs: usize) -> Self {
        self.max_concurrent_jobs = max_concurrent_jobs;
        self
    }

    /// Returns the install call budget for the given deployment app type.
    pub fn install_timeout_for(&self, app_type: DeploymentAppType) -> Duration {
        let mins = match app_type {
            DeploymentAppType::Helm => self.helm_install_request_timeout_mins,
            DeploymentAppType::Gitops | DeploymentAppType::Flux => {
                self.argocd_install_request_timeout_mins
            }
        };
        Duration::from_secs(mins.max(0) as u64 * 60)
    }

    /// Returns the install budget for the given app type, in minutes.
    ///
    /// Used to word timeout failure messages.
    pub fn install_timeout_mins_for(&self, app_type: DeploymentAppType) -> i64 {
        match app_type {
            DeploymentAppType::Helm => self.helm_install_request_timeout_mins,
            DeploymentAppType::Gitops | DeploymentAppType::Flux => {
                self.argocd_install_request_timeout_mins
            }
        }
    }

    /// Returns the minimum age of a GitOps runner before the Argo sweep
    /// considers it, in seconds.
    pub fn argocd_stuck_threshold_secs(&self) -> i64 {
        self.argocd_manual_sync_deployed_before_mins.max(0) * 60
    }

    /// Returns the fan-out batch size, never below one.
    pub fn fan_out_batch_size(&self) -> usize {
        self.ci_auto_trigger_batch_size.max(1) as usize
    }

    /// Returns the interval between Helm reconcile sweeps.
    pub fn helm_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.helm_sweep_interval_secs)
    }

    /// Returns the interval between Argo reconcile sweeps.
    pub fn argocd_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.argocd_sweep_interval_secs)
    }

    /// Returns the interval between degradation sweeps.
    pub fn degradation_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.degradation_sweep_interval_secs)
    }

    /// Validates the behavior knobs.
    ///
    /// Connection configs validate themselves when their clients are
    /// built; this only covers the engine's own settings.
    pub fn validate(&self) -> Result<()> {
        if self.helm_install_request_timeout_mins <= 0 {
            return Err(EngineError::validation(
                "helm install request timeout must be positive",
            ));
        }
        if self.argocd_install_request_timeout_mins <= 0 {
            return Err(EngineError::validation(
                "argocd install request timeout must be positive",
            ));
        }
        if self.max_cd_workflow_runner_retries < 0 {
            return Err(EngineError::validation(
                "max workflow runner retries must not be negative",
            ));
        }
        if self.helm_sweep_interval_secs == 0
            || self.argocd_sweep_interval_secs == 0
            || self.degradation_sweep_interval_secs == 0
        {
            return Err(EngineError::validation("sweep intervals must be positive"));
        }
        if self.argocd_degradation_threshold_secs <= 0 {
            return Err(EngineError::validation(
                "argocd degradation threshold must be positive",
            ));
        }
        if self.max_concurrent_jobs == 0 {
            return Err(EngineError::validation(
                "max concurrent jobs must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use conveyor_drivers::DriverConfig;

    use super::*;

    fn test_config() -> EngineConfig {
        EngineConfig::new(
            PgConfig::new("postgres://localhost/conveyor"),
            NatsConfig::new("nats://localhost:4222", "token"),
            DriverConfig::new(
                "http://localhost:8081",
                "http://localhost:8082",
                "http://localhost:8083",
            ),
        )
    }

    #[test]
    fn defaults_pass_validation() {
        let config = test_config();
        config.validate().expect("defaults should validate");
        assert_eq!(config.max_concurrent_jobs, DEFAULT_MAX_CONCURRENT_JOBS);
        assert!(!config.expose_cd_metrics);
        assert!(!config.workflow_retries_enabled);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config = test_config();
        config.helm_install_request_timeout_mins = 0;
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.argocd_install_request_timeout_mins = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_sweep_interval_is_rejected() {
        let mut config = test_config();
        config.argocd_sweep_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn install_timeout_follows_app_type() {
        let mut config = test_config();
        config.helm_install_request_timeout_mins = 6;
        config.argocd_install_request_timeout_mins = 3;

        assert_eq!(
            config.install_timeout_for(DeploymentAppType::Helm),
            Duration::from_secs(360)
        );
        assert_eq!(
            config.install_timeout_for(DeploymentAppType::Gitops),
            Duration::from_secs(180)
        );
        assert_eq!(
            config.install_timeout_for(DeploymentAppType::Flux),
            Duration::from_secs(180)
        );
    }

    #[test]
    fn fan_out_batch_size_is_clamped() {
        let mut config = test_config();
        config.ci_auto_trigger_batch_size = 0;
        assert_eq!(config.fan_out_batch_size(), 1);

        config.ci_auto_trigger_batch_size = -3;
        assert_eq!(config.fan_out_batch_size(), 1);

        config.ci_auto_trigger_batch_size = 7;
        assert_eq!(config.fan_out_batch_size(), 7);
    }
}
