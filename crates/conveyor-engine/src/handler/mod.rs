//! Background workers consuming the engine's message streams.
//!
//! Four workers run per engine instance:
//! - [`DeployWorker`] consumes queued deploy requests and drives the
//!   release drivers.
//! - [`StatusSyncWorker`] serves on-demand status refresh requests.
//! - [`CiCompleteWorker`] registers finished build artifacts and fans
//!   them out to downstream pipelines.
//! - [`ReconcileWorker`] runs the periodic reconciliation sweeps.

mod ci_complete;
mod deploy;
mod reconcile;
mod status_sync;

use std::sync::Arc;
use std::time::Duration;

use conveyor_nats::stream::TypedMessage;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use self::ci_complete::CiCompleteWorker;
pub use self::deploy::DeployWorker;
pub use self::reconcile::ReconcileWorker;
pub use self::status_sync::StatusSyncWorker;
use crate::service::{DagPropagator, EngineState, Propagator, Reconciler, TriggerService};
use crate::{EngineError, Result};

/// Join handles of the spawned engine workers.
pub struct WorkerHandles {
    /// Deploy request worker.
    pub deploy: JoinHandle<Result<()>>,
    /// Status sync worker.
    pub status_sync: JoinHandle<Result<()>>,
    /// CI completion worker.
    pub ci_complete: JoinHandle<Result<()>>,
    /// Reconciliation sweep worker.
    pub reconcile: JoinHandle<Result<()>>,
}

impl WorkerHandles {
    /// Waits for every worker to stop, surfacing the first failure.
    pub async fn join_all(self) -> Result<()> {
        for handle in [self.deploy, self.status_sync, self.ci_complete, self.reconcile] {
            match handle.await {
                Ok(result) => result?,
                Err(err) => {
                    return Err(EngineError::processing_with_source(
                        "Worker task panicked or was aborted",
                        err,
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Builds the engine services and spawns all workers.
///
/// Workers stop when `cancel_token` fires; await the returned handles to
/// complete shutdown.
pub async fn spawn_workers(
    state: EngineState,
    cancel_token: CancellationToken,
) -> Result<WorkerHandles> {
    let trigger = TriggerService::new(state.clone()).await?;
    let propagator: Arc<dyn Propagator> = Arc::new(DagPropagator::new(state.clone(), trigger.clone()));
    let sync_publisher = state.nats.status_sync_publisher().await?;
    let reconciler = Reconciler::new(state.clone(), propagator.clone(), sync_publisher);

    let deploy = DeployWorker::new(state.clone(), trigger, cancel_token.clone()).spawn();
    let status_sync =
        StatusSyncWorker::new(state.clone(), reconciler.clone(), cancel_token.clone()).spawn();
    let ci_complete =
        CiCompleteWorker::new(state.clone(), propagator, cancel_token.clone()).spawn();
    let reconcile = ReconcileWorker::new(state, reconciler, cancel_token).spawn();

    Ok(WorkerHandles {
        deploy,
        status_sync,
        ci_complete,
        reconcile,
    })
}

/// Acknowledges a handled message, logging an acknowledgement failure
/// instead of surfacing it.
pub(crate) async fn ack_message<T>(msg: &TypedMessage<T>, target: &'static str) {
    if let Err(err) = msg.ack().await {
        tracing::error!(target = target, error = %err, "Failed to ack message");
    }
}

/// Settles a message whose handler failed.
///
/// Retryable errors are redelivered with a growing delay; everything
/// else is acknowledged so a poisoned message cannot wedge the stream.
pub(crate) async fn settle_failure<T>(
    msg: &TypedMessage<T>,
    err: &EngineError,
    target: &'static str,
) {
    if err.is_retryable() {
        let delay = redelivery_delay(msg.delivery_count());
        tracing::warn!(
            target = target,
            error = %err,
            delay_secs = delay.as_secs(),
            "Transient failure, requesting redelivery"
        );
        if let Err(nak_err) = msg.nak(Some(delay)).await {
            tracing::error!(target = target, error = %nak_err, "Failed to nak message");
        }
        return;
    }

    if matches!(err, EngineError::Validation { .. }) {
        tracing::warn!(target = target, error = %err, "Dropping invalid message");
    } else {
        tracing::error!(target = target, error = %err, "Message handling failed");
    }
    ack_message(msg, target).await;
}

/// Redelivery backoff: five seconds per delivery already attempted.
pub(crate) fn redelivery_delay(delivery_count: Option<i64>) -> Duration {
    let attempts = delivery_count.unwrap_or(1).max(1) as u64;
    Duration::from_secs(5 * attempts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redelivery_backs_off_linearly() {
        assert_eq!(redelivery_delay(Some(1)), Duration::from_secs(5));
        assert_eq!(redelivery_delay(Some(2)), Duration::from_secs(10));
        assert_eq!(redelivery_delay(Some(3)), Duration::from_secs(15));
    }

    #[test]
    fn missing_delivery_count_gets_the_base_delay() {
        assert_eq!(redelivery_delay(None), Duration::from_secs(5));
        assert_eq!(redelivery_delay(Some(0)), Duration::from_secs(5));
        assert_eq!(redelivery_delay(Some(-3)), Duration::from_secs(5));
    }
}
