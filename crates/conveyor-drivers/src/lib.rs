#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod argocd;
pub mod flux;
pub mod helm;

mod config;
mod error;
mod http;
mod registry;
mod release;

pub use config::{
    ArgoCdDriverConfig, DEFAULT_TIMEOUT, DriverConfig, FluxDriverConfig, HelmDriverConfig,
};
pub use error::{DriverError, DriverResult};
pub use registry::DriverRegistry;
pub use release::{
    AppIdentifier, AppStatus, HealthStatus, InstallRequest, InstallResult, OperationPhase,
    ReleaseDriver, ReleaseStatus, SyncResult, SyncStatus,
};

/// Tracing target for release driver operations.
pub const TRACING_TARGET: &str = "conveyor_drivers";
