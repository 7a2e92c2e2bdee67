#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;
pub mod handler;
pub mod metrics;
pub mod service;

pub use error::{EngineError, Result};
pub use handler::{
    CiCompleteWorker, DeployWorker, ReconcileWorker, StatusSyncWorker, WorkerHandles,
    spawn_workers,
};
pub use service::{
    DagPropagator, EngineConfig, EngineState, Propagator, Reconciler, RetriggerOutcome,
    RetriggerService, StageTriggerRequest, TriggerOutcome, TriggerService,
};
