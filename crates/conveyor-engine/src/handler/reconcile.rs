//! Worker driving the periodic reconcile sweeps.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::service::{EngineState, Reconciler};
use crate::Result;

const TRACING_TARGET: &str = "conveyor_engine::reconcile";

/// Background worker running the three periodic sweeps: stuck Helm
/// installs, stuck GitOps runners, and post-apply degradation checks.
///
/// Each sweep ticks on its own schedule so a slow Helm pass never
/// delays degradation detection.
pub struct ReconcileWorker {
    state: EngineState,
    reconciler: Reconciler,
    cancel_token: CancellationToken,
}

impl ReconcileWorker {
    /// Creates a new reconcile worker.
    pub fn new(
        state: EngineState,
        reconciler: Reconciler,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            state,
            reconciler,
            cancel_token,
        }
    }

    /// Spawns the worker as a background task.
    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }

    /// Runs the sweep loops until shutdown.
    #[tracing::instrument(skip(self), target = TRACING_TARGET, name = "reconcile_worker")]
    async fn run(self) -> Result<()> {
        tracing::info!(target: TRACING_TARGET, "Starting reconcile worker");

        let loops = [
            (SweepKind::Helm, self.state.config.helm_sweep_interval()),
            (SweepKind::Argo, self.state.config.argocd_sweep_interval()),
            (
                SweepKind::Degradation,
                self.state.config.degradation_sweep_interval(),
            ),
        ]
        .map(|(kind, period)| {
            tokio::spawn(sweep_loop(
                self.reconciler.clone(),
                kind,
                period,
                self.cancel_token.clone(),
            ))
        });

        for handle in loops {
            if let Err(err) = handle.await {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %err,
                    "Sweep loop panicked or was aborted"
                );
            }
        }

        tracing::info!(target: TRACING_TARGET, "Reconcile worker stopped");
        Ok(())
    }
}

/// One of the periodic reconcile passes.
#[derive(Debug, Clone, Copy)]
enum SweepKind {
    Helm,
    Argo,
    Degradation,
}

impl SweepKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Helm => "helm",
            Self::Argo => "argo",
            Self::Degradation => "degradation",
        }
    }

    async fn run(self, reconciler: &Reconciler) -> Result<usize> {
        match self {
            Self::Helm => reconciler.run_helm_sweep().await,
            Self::Argo => reconciler.run_argo_sweep().await,
            Self::Degradation => reconciler.run_degradation_sweep().await,
        }
    }
}

/// Ticks one sweep on its period until the token cancels.
///
/// The first tick fires immediately so a restart catches up on runners
/// that went stale while the engine was down. Sweep errors are logged
/// and the loop keeps ticking.
async fn sweep_loop(
    reconciler: Reconciler,
    kind: SweepKind,
    period: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            () = cancel_token.cancelled() => {
                tracing::info!(
                    target: TRACING_TARGET,
                    sweep = kind.as_str(),
                    "Shutdown requested, stopping sweep"
                );
                break;
            }

            _ = ticker.tick() => {
                match kind.run(&reconciler).await {
                    Ok(processed) => tracing::debug!(
                        target: TRACING_TARGET,
                        sweep = kind.as_str(),
                        processed,
                        "Sweep pass finished"
                    ),
                    Err(err) => tracing::error!(
                        target: TRACING_TARGET,
                        sweep = kind.as_str(),
                        error = %err,
                        "Sweep pass failed"
                    ),
                }
            }
        }
    }
}
