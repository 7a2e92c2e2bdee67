//! Worker registering finished builds and fanning them out.

use std::sync::Arc;

use conveyor_nats::stream::{CiCompleteEvent, TypedMessage};
use conveyor_postgres::model::{CiArtifact, NewCiArtifact};
use conveyor_postgres::query::CiArtifactRepository;
use conveyor_postgres::types::ArtifactDataSource;
use conveyor_postgres::PgConn;
use futures::StreamExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{ack_message, settle_failure};
use crate::service::{EngineState, Propagator};
use crate::Result;

const TRACING_TARGET: &str = "conveyor_engine::ci_complete";

/// Background worker that turns build completion events into artifact
/// rows and automatic downstream triggers.
pub struct CiCompleteWorker {
    state: EngineState,
    propagator: Arc<dyn Propagator>,
    cancel_token: CancellationToken,
    semaphore: Arc<Semaphore>,
}

impl CiCompleteWorker {
    /// Creates a new CI completion worker.
    pub fn new(
        state: EngineState,
        propagator: Arc<dyn Propagator>,
        cancel_token: CancellationToken,
    ) -> Self {
        let semaphore = state.create_semaphore();
        Self {
            state,
            propagator,
            cancel_token,
            semaphore,
        }
    }

    /// Spawns the worker as a background task.
    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }

    /// Runs the worker loop, registering builds as they complete.
    #[tracing::instrument(skip(self), target = TRACING_TARGET, name = "ci_complete_worker")]
    async fn run(self) -> Result<()> {
        tracing::info!(target: TRACING_TARGET, "Starting CI completion worker");

        let subscriber = self.state.nats.ci_complete_subscriber().await?;
        let mut stream = subscriber.subscribe().await?;

        loop {
            tokio::select! {
                biased;

                () = self.cancel_token.cancelled() => {
                    tracing::info!(
                        target: TRACING_TARGET,
                        "Shutdown requested, stopping CI completion worker"
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

                    let state = self.state.clone();
                    let propagator = self.propagator.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        handle_message(&state, propagator.as_ref(), msg).await;
                    });
                }
            }
        }

        Ok(())
    }
}

/// Handles one build completion event and settles its acknowledgement.
#[tracing::instrument(
    skip_all,
    fields(event_id = %msg.payload().event_id, ci_pipeline_id = msg.payload().pipeline_id),
    target = TRACING_TARGET
)]
async fn handle_message(
    state: &EngineState,
    propagator: &dyn Propagator,
    msg: TypedMessage<CiCompleteEvent>,
) {
    let event = msg.payload().clone();

    let result = async {
        let mut conn = state.connection().await?;
        let artifact = register_artifacts(&mut conn, &event).await?;
        drop(conn);

        propagator
            .handle_ci_success(event.pipeline_id, artifact.id, event.user_id)
            .await?;
        Ok::<_, crate::EngineError>(artifact)
    }
    .await;

    match result {
        Ok(artifact) => {
            tracing::info!(
                target: TRACING_TARGET,
                artifact_id = artifact.id,
                image = %artifact.image,
                "Build registered and fanned out"
            );
            ack_message(&msg, TRACING_TARGET).await;
        }
        Err(err) => settle_failure(&msg, &err, TRACING_TARGET).await,
    }
}

/// Registers the built artifact plus any plugin-produced copies in
/// other registries, returning the primary artifact.
///
/// Registration is idempotent per `(pipeline, image)` so redelivered
/// events reuse the stored row instead of duplicating it.
async fn register_artifacts(conn: &mut PgConn, event: &CiCompleteEvent) -> Result<CiArtifact> {
    if let Some(existing) = conn
        .find_ci_artifact_by_image(event.pipeline_id, &event.image)
        .await?
    {
        tracing::debug!(
            target: TRACING_TARGET,
            artifact_id = existing.id,
            "Image already registered, reusing artifact"
        );
        return Ok(existing);
    }

    let build = conn
        .create_ci_artifact(NewCiArtifact {
            pipeline_id: Some(event.pipeline_id),
            component_id: None,
            image: event.image.clone(),
            image_digest: Some(event.image_digest.clone()),
            material_info: Some(event.material_info.clone()),
            data_source: parse_data_source(&event.data_source),
            parent_ci_artifact_id: None,
            scan_enabled: Some(event.is_scan_enabled),
            scanned: Some(false),
            is_artifact_uploaded: Some(event.is_artifact_uploaded),
        })
        .await?;

    let Some(details) = &event.plugin_registry_artifact_details else {
        return Ok(build);
    };
    for (registry, images) in details {
        for image in images {
            if image.is_empty() {
                continue;
            }
            conn.create_ci_artifact(NewCiArtifact {
                pipeline_id: None,
                component_id: Some(registry.clone()),
                image: image.clone(),
                image_digest: None,
                material_info: Some(event.material_info.clone()),
                data_source: ArtifactDataSource::CiRunner,
                parent_ci_artifact_id: Some(build.id),
                scan_enabled: Some(event.is_scan_enabled),
                scanned: Some(false),
                is_artifact_uploaded: Some(event.is_artifact_uploaded),
            })
            .await?;
        }
    }
    Ok(build)
}

/// Normalizes the data source label builders send, e.g. `"CI-RUNNER"`.
fn parse_data_source(raw: &str) -> ArtifactDataSource {
    match raw.replace('-', "_").to_ascii_lowercase().as_str() {
        "ci_runner" => ArtifactDataSource::CiRunner,
        "external" => ArtifactDataSource::External,
        "pre_cd" => ArtifactDataSource::PreCd,
        "post_cd" => ArtifactDataSource::PostCd,
        other => {
            tracing::warn!(
                target: TRACING_TARGET,
                data_source = other,
                "Unknown artifact data source, treating as runner-built"
            );
            ArtifactDataSource::CiRunner
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_labels_normalize() {
        assert_eq!(parse_data_source("CI-RUNNER"), ArtifactDataSource::CiRunner);
        assert_eq!(parse_data_source("ci_runner"), ArtifactDataSource::CiRunner);
        assert_eq!(parse_data_source("EXT"), ArtifactDataSource::CiRunner);
        assert_eq!(parse_data_source("external"), ArtifactDataSource::External);
        assert_eq!(parse_data_source("External"), ArtifactDataSource::External);
        assert_eq!(parse_data_source("POST-CD"), ArtifactDataSource::PostCd);
    }
}
