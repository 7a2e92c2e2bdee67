//! Core engine services: triggering, reconciliation, propagation, and
//! retries.

mod config;
mod contexts;
mod propagator;
mod reconciler;
mod retrigger;
mod state;
mod trigger;

pub use config::{
    EngineConfig, DEFAULT_ARGOCD_DEGRADATION_THRESHOLD_SECS, DEFAULT_ARGOCD_DEPLOYED_BEFORE_MINS,
    DEFAULT_ARGOCD_INSTALL_TIMEOUT_MINS, DEFAULT_ARGOCD_SWEEP_INTERVAL_SECS,
    DEFAULT_CI_AUTO_TRIGGER_BATCH_SIZE, DEFAULT_DEGRADATION_SWEEP_INTERVAL_SECS,
    DEFAULT_HELM_INSTALL_TIMEOUT_MINS, DEFAULT_HELM_SWEEP_INTERVAL_SECS,
    DEFAULT_MAX_CONCURRENT_JOBS, DEFAULT_MAX_RUNNER_RETRIES,
};
pub use propagator::{DagPropagator, Propagator};
pub use reconciler::Reconciler;
pub use retrigger::{RetriggerOutcome, RetriggerService};
pub use state::EngineState;
pub use trigger::{StageTriggerRequest, TriggerOutcome, TriggerService, SUPERSEDED_MESSAGE};
