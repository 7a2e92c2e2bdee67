//! CI artifacts repository for managing container image artifacts.

use std::future::Future;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::model::{CiArtifact, NewCiArtifact, UpdateCiArtifact};
use crate::types::ArtifactDataSource;
use crate::{PgConnection, PgError, PgResult, schema};

/// Repository for CI artifact database operations.
pub trait CiArtifactRepository {
    /// Creates a new artifact record.
    fn create_ci_artifact(
        &mut self,
        new_artifact: NewCiArtifact,
    ) -> impl Future<Output = PgResult<CiArtifact>> + Send;

    /// Finds an artifact by its unique identifier.
    fn find_ci_artifact_by_id(
        &mut self,
        artifact_id: i64,
    ) -> impl Future<Output = PgResult<Option<CiArtifact>>> + Send;

    /// Finds the newest artifact a pipeline registered for an image.
    ///
    /// Build completion events redeliver after transient failures; this
    /// lookup keeps the registration idempotent.
    fn find_ci_artifact_by_image(
        &mut self,
        pipeline_id: i64,
        image: &str,
    ) -> impl Future<Output = PgResult<Option<CiArtifact>>> + Send;

    /// Finds the newest artifact a hook stage of `producer_pipeline_id`
    /// derived from `parent_artifact_id`.
    ///
    /// Downstream pipelines prefer such derived artifacts over the parent
    /// when chaining off a finished deployment.
    fn find_derived_artifact(
        &mut self,
        producer_pipeline_id: i64,
        parent_artifact_id: i64,
        data_source: ArtifactDataSource,
    ) -> impl Future<Output = PgResult<Option<CiArtifact>>> + Send;

    /// Updates an artifact with new data.
    fn update_ci_artifact(
        &mut self,
        artifact_id: i64,
        updates: UpdateCiArtifact,
    ) -> impl Future<Output = PgResult<CiArtifact>> + Send;
}

impl CiArtifactRepository for PgConnection {
    async fn create_ci_artifact(&mut self, new_artifact: NewCiArtifact) -> PgResult<CiArtifact> {
        use schema::ci_artifact;

        let artifact = diesel::insert_into(ci_artifact::table)
            .values(&new_artifact)
            .returning(CiArtifact::as_returning())
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        Ok(artifact)
    }

    async fn find_ci_artifact_by_id(&mut self, artifact_id: i64) -> PgResult<Option<CiArtifact>> {
        use schema::ci_artifact::{self, dsl};

        let artifact = ci_artifact::table
            .filter(dsl::id.eq(artifact_id))
            .select(CiArtifact::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(artifact)
    }

    async fn find_ci_artifact_by_image(
        &mut self,
        pipeline_id: i64,
        image: &str,
    ) -> PgResult<Option<CiArtifact>> {
        use schema::ci_artifact::{self, dsl};

        let artifact = ci_artifact::table
            .filter(dsl::pipeline_id.eq(pipeline_id))
            .filter(dsl::image.eq(image))
            .order(dsl::id.desc())
            .select(CiArtifact::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(artifact)
    }

    async fn find_derived_artifact(
        &mut self,
        producer_pipeline_id: i64,
        parent_artifact_id: i64,
        data_source: ArtifactDataSource,
    ) -> PgResult<Option<CiArtifact>> {
        use schema::ci_artifact::{self, dsl};

        let artifact = ci_artifact::table
            .filter(dsl::pipeline_id.eq(producer_pipeline_id))
            .filter(dsl::parent_ci_artifact_id.eq(parent_artifact_id))
            .filter(dsl::data_source.eq(data_source))
            .order(dsl::id.desc())
            .select(CiArtifact::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(artifact)
    }

    async fn update_ci_artifact(
        &mut self,
        artifact_id: i64,
        updates: UpdateCiArtifact,
    ) -> PgResult<CiArtifact> {
        use diesel::dsl::now;
        use schema::ci_artifact::{self, dsl};

        let artifact = diesel::update(ci_artifact::table.filter(dsl::id.eq(artifact_id)))
            .set((&updates, dsl::updated_on.eq(now)))
            .returning(CiArtifact::as_returning())
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        Ok(artifact)
    }
}
