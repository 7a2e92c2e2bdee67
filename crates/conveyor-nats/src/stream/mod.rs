//! JetStream streams for deployment triggers and status propagation.
//!
//! This module provides type-safe streaming capabilities for:
//!
//! - Deployment trigger requests
//! - Pipeline status sync requests
//! - CI completion events

// Base types
mod event_pub;
mod event_stream;
mod event_sub;
mod stream_pub;
mod stream_sub;

// Event payloads
mod ci_complete;
mod deploy_request;
mod status_sync;

pub use ci_complete::CiCompleteEvent;
pub use deploy_request::DeployRequest;
pub use event_pub::EventPublisher;
pub use event_stream::{CiCompleteStream, DeployRequestStream, EventStream, StatusSyncStream};
pub use event_sub::EventSubscriber;
pub use status_sync::PipelineStatusSyncEvent;
pub use stream_pub::StreamPublisher;
pub use stream_sub::{StreamSubscriber, TypedBatchStream, TypedMessage, TypedMessageStream};

/// Publisher for [`DeployRequest`] events.
pub type DeployRequestPublisher = EventPublisher<DeployRequest, DeployRequestStream>;
/// Subscriber for [`DeployRequest`] events.
pub type DeployRequestSubscriber = EventSubscriber<DeployRequest, DeployRequestStream>;

/// Publisher for [`PipelineStatusSyncEvent`] events.
pub type StatusSyncPublisher = EventPublisher<PipelineStatusSyncEvent, StatusSyncStream>;
/// Subscriber for [`PipelineStatusSyncEvent`] events.
pub type StatusSyncSubscriber = EventSubscriber<PipelineStatusSyncEvent, StatusSyncStream>;

/// Publisher for [`CiCompleteEvent`] events.
pub type CiCompletePublisher = EventPublisher<CiCompleteEvent, CiCompleteStream>;
/// Subscriber for [`CiCompleteEvent`] events.
pub type CiCompleteSubscriber = EventSubscriber<CiCompleteEvent, CiCompleteStream>;
