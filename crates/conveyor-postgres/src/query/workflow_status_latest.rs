//! Latest workflow status index repository for constant-time lookups.

use std::future::Future;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::model::{CdWorkflowStatusLatest, CiWorkflowStatusLatest, NewCiWorkflowStatusLatest};
use crate::types::WorkflowType;
use crate::{PgConnection, PgError, PgResult, schema};

/// Repository for the latest workflow status index.
///
/// The CD side of the index is written together with the runner insert in
/// [`CdWorkflowRunnerRepository::save_runner_with_latest`]; this trait
/// covers the CI side and the read paths.
///
/// [`CdWorkflowRunnerRepository::save_runner_with_latest`]: crate::query::CdWorkflowRunnerRepository::save_runner_with_latest
pub trait WorkflowStatusLatestRepository {
    /// Points the CI index entry of a pipeline at a new workflow.
    fn upsert_latest_ci_workflow(
        &mut self,
        new_entry: NewCiWorkflowStatusLatest,
    ) -> impl Future<Output = PgResult<CiWorkflowStatusLatest>> + Send;

    /// Gets the CI index entry of a pipeline.
    fn find_latest_ci_workflow(
        &mut self,
        pipeline_id: i64,
    ) -> impl Future<Output = PgResult<Option<CiWorkflowStatusLatest>>> + Send;

    /// Gets the CD index entry of a pipeline for one workflow stage.
    fn find_latest_cd_entry(
        &mut self,
        pipeline_id: i64,
        workflow_type: WorkflowType,
    ) -> impl Future<Output = PgResult<Option<CdWorkflowStatusLatest>>> + Send;

    /// Lists the CD index entries of a pipeline across all stages.
    fn list_latest_cd_entries(
        &mut self,
        pipeline_id: i64,
    ) -> impl Future<Output = PgResult<Vec<CdWorkflowStatusLatest>>> + Send;
}

impl WorkflowStatusLatestRepository for PgConnection {
    async fn upsert_latest_ci_workflow(
        &mut self,
        new_entry: NewCiWorkflowStatusLatest,
    ) -> PgResult<CiWorkflowStatusLatest> {
        use diesel::dsl::now;
        use schema::ci_workflow_status_latest::{self, dsl};

        let entry = diesel::insert_into(ci_workflow_status_latest::table)
            .values(&new_entry)
            .on_conflict(dsl::pipeline_id)
            .do_update()
            .set((
                dsl::ci_workflow_id.eq(new_entry.ci_workflow_id),
                dsl::app_id.eq(new_entry.app_id),
                dsl::updated_on.eq(now),
            ))
            .returning(CiWorkflowStatusLatest::as_returning())
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        Ok(entry)
    }

    async fn find_latest_ci_workflow(
        &mut self,
        pipeline_id: i64,
    ) -> PgResult<Option<CiWorkflowStatusLatest>> {
        use schema::ci_workflow_status_latest::{self, dsl};

        let entry = ci_workflow_status_latest::table
            .filter(dsl::pipeline_id.eq(pipeline_id))
            .select(CiWorkflowStatusLatest::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(entry)
    }

    async fn find_latest_cd_entry(
        &mut self,
        pipeline_id: i64,
        workflow_type: WorkflowType,
    ) -> PgResult<Option<CdWorkflowStatusLatest>> {
        use schema::cd_workflow_status_latest::{self, dsl};

        let entry = cd_workflow_status_latest::table
            .filter(dsl::pipeline_id.eq(pipeline_id))
            .filter(dsl::workflow_type.eq(workflow_type))
            .select(CdWorkflowStatusLatest::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(entry)
    }

    async fn list_latest_cd_entries(
        &mut self,
        pipeline_id: i64,
    ) -> PgResult<Vec<CdWorkflowStatusLatest>> {
        use schema::cd_workflow_status_latest::{self, dsl};

        let entries = cd_workflow_status_latest::table
            .filter(dsl::pipeline_id.eq(pipeline_id))
            .order(dsl::workflow_type.asc())
            .select(CdWorkflowStatusLatest::as_select())
            .load(self)
            .await
            .map_err(PgError::from)?;

        Ok(entries)
    }
}
