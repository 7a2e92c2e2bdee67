//! Pipelines repository for managing deployment pipelines and their graph.

use std::future::Future;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::model::{NewPipeline, Pipeline, UpdatePipeline};
use crate::{PgConnection, PgError, PgResult, schema};

/// Repository for deployment pipeline database operations.
///
/// Handles pipeline lookup for triggering and the workflow-graph queries
/// used when propagating a finished deployment to its dependents.
pub trait PipelineRepository {
    /// Creates a new pipeline record.
    fn create_pipeline(
        &mut self,
        new_pipeline: NewPipeline,
    ) -> impl Future<Output = PgResult<Pipeline>> + Send;

    /// Finds a live pipeline by its unique identifier.
    ///
    /// Soft-deleted pipelines are not returned.
    fn find_pipeline_by_id(
        &mut self,
        pipeline_id: i64,
    ) -> impl Future<Output = PgResult<Option<Pipeline>>> + Send;

    /// Finds all live pipelines with the given identifiers.
    fn find_pipelines_by_ids(
        &mut self,
        pipeline_ids: Vec<i64>,
    ) -> impl Future<Output = PgResult<Vec<Pipeline>>> + Send;

    /// Lists live deployment pipelines fed directly by a CI pipeline.
    ///
    /// Pipelines that additionally chain after another deployment pipeline
    /// are excluded; those fire from their parent, not from CI.
    fn find_pipelines_by_ci_pipeline(
        &mut self,
        ci_pipeline_id: i64,
    ) -> impl Future<Output = PgResult<Vec<Pipeline>>> + Send;

    /// Lists live deployment pipelines chained after the given pipeline.
    fn find_child_pipelines(
        &mut self,
        pipeline_id: i64,
    ) -> impl Future<Output = PgResult<Vec<Pipeline>>> + Send;

    /// Updates a pipeline with new data.
    fn update_pipeline(
        &mut self,
        pipeline_id: i64,
        updates: UpdatePipeline,
    ) -> impl Future<Output = PgResult<Pipeline>> + Send;
}

impl PipelineRepository for PgConnection {
    async fn create_pipeline(&mut self, new_pipeline: NewPipeline) -> PgResult<Pipeline> {
        use schema::pipeline;

        let pipeline = diesel::insert_into(pipeline::table)
            .values(&new_pipeline)
            .returning(Pipeline::as_returning())
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        Ok(pipeline)
    }

    async fn find_pipeline_by_id(&mut self, pipeline_id: i64) -> PgResult<Option<Pipeline>> {
        use schema::pipeline::{self, dsl};

        let pipeline = pipeline::table
            .filter(dsl::id.eq(pipeline_id))
            .filter(dsl::deleted.eq(false))
            .select(Pipeline::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(pipeline)
    }

    async fn find_pipelines_by_ids(&mut self, pipeline_ids: Vec<i64>) -> PgResult<Vec<Pipeline>> {
        use schema::pipeline::{self, dsl};

        let pipelines = pipeline::table
            .filter(dsl::id.eq_any(pipeline_ids))
            .filter(dsl::deleted.eq(false))
            .order(dsl::id.asc())
            .select(Pipeline::as_select())
            .load(self)
            .await
            .map_err(PgError::from)?;

        Ok(pipelines)
    }

    async fn find_pipelines_by_ci_pipeline(
        &mut self,
        ci_pipeline_id: i64,
    ) -> PgResult<Vec<Pipeline>> {
        use schema::pipeline::{self, dsl};

        let pipelines = pipeline::table
            .filter(dsl::ci_pipeline_id.eq(ci_pipeline_id))
            .filter(dsl::parent_pipeline_id.is_null())
            .filter(dsl::deleted.eq(false))
            .order(dsl::id.asc())
            .select(Pipeline::as_select())
            .load(self)
            .await
            .map_err(PgError::from)?;

        Ok(pipelines)
    }

    async fn find_child_pipelines(&mut self, pipeline_id: i64) -> PgResult<Vec<Pipeline>> {
        use schema::pipeline::{self, dsl};

        let pipelines = pipeline::table
            .filter(dsl::parent_pipeline_id.eq(pipeline_id))
            .filter(dsl::deleted.eq(false))
            .order(dsl::id.asc())
            .select(Pipeline::as_select())
            .load(self)
            .await
            .map_err(PgError::from)?;

        Ok(pipelines)
    }

    async fn update_pipeline(
        &mut self,
        pipeline_id: i64,
        updates: UpdatePipeline,
    ) -> PgResult<Pipeline> {
        use diesel::dsl::now;
        use schema::pipeline::{self, dsl};

        let pipeline = diesel::update(pipeline::table.filter(dsl::id.eq(pipeline_id)))
            .set((&updates, dsl::updated_on.eq(now)))
            .returning(Pipeline::as_returning())
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        Ok(pipeline)
    }
}
