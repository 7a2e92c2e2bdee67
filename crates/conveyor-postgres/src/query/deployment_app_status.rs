//! Deployment app status repository for per-environment health records.

use std::future::Future;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::model::{DeploymentAppStatus, NewDeploymentAppStatus};
use crate::{PgConnection, PgError, PgResult, schema};

/// Repository for deployment app status database operations.
pub trait DeploymentAppStatusRepository {
    /// Writes the observed health of an application in an environment,
    /// replacing any previous observation.
    fn upsert_deployment_app_status(
        &mut self,
        new_status: NewDeploymentAppStatus,
    ) -> impl Future<Output = PgResult<DeploymentAppStatus>> + Send;

    /// Gets the last observed health of an application in an environment.
    fn find_deployment_app_status(
        &mut self,
        app_id: i64,
        environment_id: i64,
    ) -> impl Future<Output = PgResult<Option<DeploymentAppStatus>>> + Send;
}

impl DeploymentAppStatusRepository for PgConnection {
    async fn upsert_deployment_app_status(
        &mut self,
        new_status: NewDeploymentAppStatus,
    ) -> PgResult<DeploymentAppStatus> {
        use diesel::dsl::now;
        use schema::deployment_app_status::{self, dsl};

        let status = diesel::insert_into(deployment_app_status::table)
            .values(&new_status)
            .on_conflict((dsl::app_id, dsl::environment_id))
            .do_update()
            .set((
                dsl::status.eq(&new_status.status),
                dsl::updated_on.eq(now),
            ))
            .returning(DeploymentAppStatus::as_returning())
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        Ok(status)
    }

    async fn find_deployment_app_status(
        &mut self,
        app_id: i64,
        environment_id: i64,
    ) -> PgResult<Option<DeploymentAppStatus>> {
        use schema::deployment_app_status::{self, dsl};

        let status = deployment_app_status::table
            .filter(dsl::app_id.eq(app_id))
            .filter(dsl::environment_id.eq(environment_id))
            .select(DeploymentAppStatus::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(status)
    }
}
