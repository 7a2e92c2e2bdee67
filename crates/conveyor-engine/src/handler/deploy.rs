//! Worker consuming queued deploy requests.

use std::sync::Arc;

use conveyor_nats::stream::{DeployRequest, TypedMessage};
use futures::StreamExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{ack_message, settle_failure};
use crate::metrics;
use crate::service::{EngineState, TriggerOutcome, TriggerService};
use crate::Result;

const TRACING_TARGET: &str = "conveyor_engine::deploy";

/// Background worker that drives release drivers from the deploy
/// request stream.
///
/// Acknowledgement is deferred until the request is handled: a worker
/// dying mid-call leaves the message unacknowledged, and the
/// orchestrator's redelivery guards make the retry safe.
pub struct DeployWorker {
    state: EngineState,
    trigger: TriggerService,
    cancel_token: CancellationToken,
    semaphore: Arc<Semaphore>,
}

impl DeployWorker {
    /// Creates a new deploy worker.
    pub fn new(state: EngineState, trigger: TriggerService, cancel_token: CancellationToken) -> Self {
        let semaphore = state.create_semaphore();
        Self {
            state,
            trigger,
            cancel_token,
            semaphore,
        }
    }

    /// Spawns the worker as a background task.
    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }

    /// Runs the worker loop, processing deploy requests as they arrive.
    #[tracing::instrument(skip(self), target = TRACING_TARGET, name = "deploy_worker")]
    async fn run(self) -> Result<()> {
        tracing::info!(target: TRACING_TARGET, "Starting deploy worker");

        let subscriber = self.state.nats.deploy_request_subscriber().await?;
        let mut stream = subscriber.subscribe().await?;

        loop {
            tokio::select! {
                biased;

                () = self.cancel_token.cancelled() => {
                    tracing::info!(
                        target: TRACING_TARGET,
                        "Shutdown requested, stopping deploy worker"
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

                    let trigger = self.trigger.clone();
                    let shutdown = self.cancel_token.clone();
                    let expose_metrics = self.state.config.expose_cd_metrics;

                    tokio::spawn(async move {
                        // Hold permit until the request settles.
                        let _permit = permit;
                        handle_message(&trigger, msg, &shutdown, expose_metrics).await;
                    });
                }
            }
        }

        Ok(())
    }
}

/// Handles one deploy request message and settles its acknowledgement.
#[tracing::instrument(skip_all, fields(wfr_id = msg.payload().wfr_id), target = TRACING_TARGET)]
async fn handle_message(
    trigger: &TriggerService,
    msg: TypedMessage<DeployRequest>,
    shutdown: &CancellationToken,
    expose_metrics: bool,
) {
    let request = msg.payload().clone();

    match trigger.process_deploy_request(&request, shutdown).await {
        Ok(outcome) => {
            tracing::info!(
                target: TRACING_TARGET,
                outcome = outcome.as_str(),
                "Deploy request handled"
            );
            if expose_metrics {
                metrics::trigger_outcome(outcome.as_str());
            }
            // A shutdown interruption persists nothing; skipping the ack
            // makes the message redeliver after restart.
            if !matches!(outcome, TriggerOutcome::Shutdown) {
                ack_message(&msg, TRACING_TARGET).await;
            }
        }
        Err(err) => settle_failure(&msg, &err, TRACING_TARGET).await,
    }
}
