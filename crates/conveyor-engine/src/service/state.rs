//! Shared engine state.

use std::sync::Arc;

use conveyor_drivers::DriverRegistry;
use conveyor_nats::NatsClient;
use conveyor_postgres::{PgClient, PgConn};
use tokio::sync::Semaphore;

use crate::service::EngineConfig;
use crate::{EngineError, Result};

/// Shared state for engine workers.
///
/// Carries the database pool, the NATS client, the release driver
/// registry, and the behavior knobs. Cloning is cheap; every worker and
/// service holds its own copy.
#[derive(Clone)]
pub struct EngineState {
    /// Postgres database client.
    pub postgres: PgClient,
    /// NATS client.
    pub nats: NatsClient,
    /// Release drivers, one per deployment app type.
    pub drivers: Arc<DriverRegistry>,
    /// Engine behavior knobs.
    pub config: Arc<EngineConfig>,
}

impl EngineState {
    /// Creates new engine state from existing clients.
    pub fn new(
        postgres: PgClient,
        nats: NatsClient,
        drivers: DriverRegistry,
        config: EngineConfig,
    ) -> Self {
        Self {
            postgres,
            nats,
            drivers: Arc::new(drivers),
            config: Arc::new(config),
        }
    }

    /// Creates engine state from configuration.
    ///
    /// Validates the knobs, builds the database client, connects to NATS,
    /// and constructs the driver registry.
    pub async fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate()?;

        let postgres = PgClient::new(config.postgres.clone()).map_err(|err| {
            EngineError::processing_with_source("Failed to create database client", err)
        })?;

        let nats = NatsClient::connect(config.nats.clone())
            .await
            .map_err(|err| EngineError::processing_with_source("Failed to connect to NATS", err))?;

        let drivers = DriverRegistry::new(config.drivers.clone()).map_err(|err| {
            EngineError::processing_with_source("Failed to build release drivers", err)
        })?;

        Ok(Self::new(postgres, nats, drivers, config.clone()))
    }

    /// Checks out a pooled database connection.
    pub async fn connection(&self) -> Result<PgConn> {
        let conn = self.postgres.get_connection().await?;
        Ok(conn)
    }

    /// Creates a semaphore sized to the configured concurrency limit.
    pub(crate) fn create_semaphore(&self) -> Arc<Semaphore> {
        Arc::new(Semaphore::new(self.config.max_concurrent_jobs))
    }
}
