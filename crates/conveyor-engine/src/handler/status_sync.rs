//! Worker serving on-demand deployment status refresh requests.

use std::sync::Arc;

use conveyor_nats::stream::{PipelineStatusSyncEvent, TypedMessage};
use futures::StreamExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{ack_message, settle_failure};
use crate::service::{EngineState, Reconciler};
use crate::Result;

const TRACING_TARGET: &str = "conveyor_engine::status_sync";

/// Background worker that re-checks one pipeline's deployment status on
/// request, outside the periodic sweep cadence.
pub struct StatusSyncWorker {
    state: EngineState,
    reconciler: Reconciler,
    cancel_token: CancellationToken,
    semaphore: Arc<Semaphore>,
}

impl StatusSyncWorker {
    /// Creates a new status sync worker.
    pub fn new(state: EngineState, reconciler: Reconciler, cancel_token: CancellationToken) -> Self {
        let semaphore = state.create_semaphore();
        Self {
            state,
            reconciler,
            cancel_token,
            semaphore,
        }
    }

    /// Spawns the worker as a background task.
    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }

    /// Runs the worker loop, serving sync requests as they arrive.
    #[tracing::instrument(skip(self), target = TRACING_TARGET, name = "status_sync_worker")]
    async fn run(self) -> Result<()> {
        tracing::info!(target: TRACING_TARGET, "Starting status sync worker");

        let subscriber = self.state.nats.status_sync_subscriber().await?;
        let mut stream = subscriber.subscribe().await?;

        loop {
            tokio::select! {
                biased;

                () = self.cancel_token.cancelled() => {
                    tracing::info!(
                        target: TRACING_TARGET,
                        "Shutdown requested, stopping status sync worker"
                    );
                    break;
                }

                item = stream.next() => {
                    let msg = match item {
                        Some(Ok(msg)) => msg,
                        Some(Err(err)) => {
                            tracing::error!(
                                target: TRACING_TARGET,
                                error = %err,
                                "Failed to receive message"
                            );
                            continue;
                        }
                        None => {
                            tracing::warn!(target: TRACING_TARGET, "Message stream closed");
                            break;
                        }
                    };

                    let permit = match self.semaphore.clone().acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            tracing::error!(
                                target: TRACING_TARGET,
                                "Semaphore closed, stopping worker"
                            );
                            break;
                        }
                    };

                    let reconciler = self.reconciler.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        handle_message(&reconciler, msg).await;
                    });
                }
            }
        }

        Ok(())
    }
}

/// Handles one sync request and settles its acknowledgement.
async fn handle_message(reconciler: &Reconciler, msg: TypedMessage<PipelineStatusSyncEvent>) {
    let event = msg.payload().clone();

    if event.is_app_store_application {
        // Chart-store installs are reconciled by their own service.
        tracing::debug!(
            target: TRACING_TARGET,
            installed_app_version_id = event.installed_app_version_id,
            "Ignoring app-store sync request"
        );
        ack_message(&msg, TRACING_TARGET).await;
        return;
    }

    let Some(pipeline_id) = event.pipeline_id else {
        tracing::warn!(target: TRACING_TARGET, "Sync request names no pipeline");
        ack_message(&msg, TRACING_TARGET).await;
        return;
    };

    match reconciler.reconcile_pipeline(pipeline_id).await {
        Ok(()) => {
            tracing::debug!(
                target: TRACING_TARGET,
                pipeline_id,
                "Status sync request served"
            );
            ack_message(&msg, TRACING_TARGET).await;
        }
        Err(err) => settle_failure(&msg, &err, TRACING_TARGET).await,
    }
}
