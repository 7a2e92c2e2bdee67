//! Prelude module for conveyor-postgres.
//!
//! This module re-exports the most commonly used types and traits from conveyor-postgres,
//! making it easy to import everything you need with a single `use` statement.
//!
//! # Example
//!
//! ```rust,no_run
//! use conveyor_postgres::prelude::*;
//!
//! # async fn example() -> PgResult<()> {
//! let config = PgConfig::new("postgresql://localhost/conveyor");
//! let client = config.build()?;
//! let mut conn = client.get_connection().await?;
//! # Ok(())
//! # }
//! ```

// Client types
pub use crate::PgConnection;
pub use crate::client::{
    ConnectionPool, MigrationResult, MigrationStatus, PgClient, PgClientExt, PgConfig, PgConn,
    PgPoolStatus,
};
// Repository traits
pub use crate::query::{
    AppRepository, CdWorkflowRepository, CdWorkflowRunnerRepository, CiArtifactRepository,
    DeploymentAppStatusRepository, PipelineRepository, PipelineStatusSyncDetailRepository,
    PipelineStatusTimelineRepository, WorkflowStatusLatestRepository,
};
// Error types
pub use crate::{PgError, PgResult};
