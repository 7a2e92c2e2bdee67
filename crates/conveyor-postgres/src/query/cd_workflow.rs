//! CD workflows repository for managing deployment workflow envelopes.

use std::future::Future;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::model::{CdWorkflow, NewCdWorkflow};
use crate::types::CdWorkflowStatus;
use crate::{PgConnection, PgError, PgResult, schema};

/// Repository for CD workflow database operations.
pub trait CdWorkflowRepository {
    /// Creates a new workflow record.
    fn create_cd_workflow(
        &mut self,
        new_workflow: NewCdWorkflow,
    ) -> impl Future<Output = PgResult<CdWorkflow>> + Send;

    /// Finds a workflow by its unique identifier.
    fn find_cd_workflow_by_id(
        &mut self,
        workflow_id: i64,
    ) -> impl Future<Output = PgResult<Option<CdWorkflow>>> + Send;

    /// Updates the request lifecycle status of a workflow.
    fn update_cd_workflow_status(
        &mut self,
        workflow_id: i64,
        workflow_status: CdWorkflowStatus,
    ) -> impl Future<Output = PgResult<CdWorkflow>> + Send;

    /// Gets the most recent workflow for a pipeline.
    fn find_latest_cd_workflow(
        &mut self,
        pipeline_id: i64,
    ) -> impl Future<Output = PgResult<Option<CdWorkflow>>> + Send;
}

impl CdWorkflowRepository for PgConnection {
    async fn create_cd_workflow(&mut self, new_workflow: NewCdWorkflow) -> PgResult<CdWorkflow> {
        use schema::cd_workflow;

        let workflow = diesel::insert_into(cd_workflow::table)
            .values(&new_workflow)
            .returning(CdWorkflow::as_returning())
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        Ok(workflow)
    }

    async fn find_cd_workflow_by_id(&mut self, workflow_id: i64) -> PgResult<Option<CdWorkflow>> {
        use schema::cd_workflow::{self, dsl};

        let workflow = cd_workflow::table
            .filter(dsl::id.eq(workflow_id))
            .select(CdWorkflow::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(workflow)
    }

    async fn update_cd_workflow_status(
        &mut self,
        workflow_id: i64,
        workflow_status: CdWorkflowStatus,
    ) -> PgResult<CdWorkflow> {
        use diesel::dsl::now;
        use schema::cd_workflow::{self, dsl};

        let workflow = diesel::update(cd_workflow::table.filter(dsl::id.eq(workflow_id)))
            .set((
                dsl::workflow_status.eq(workflow_status),
                dsl::updated_on.eq(now),
            ))
            .returning(CdWorkflow::as_returning())
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        Ok(workflow)
    }

    async fn find_latest_cd_workflow(&mut self, pipeline_id: i64) -> PgResult<Option<CdWorkflow>> {
        use schema::cd_workflow::{self, dsl};

        let workflow = cd_workflow::table
            .filter(dsl::pipeline_id.eq(pipeline_id))
            .order(dsl::id.desc())
            .select(CdWorkflow::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(workflow)
    }
}
