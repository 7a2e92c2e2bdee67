//! Applications repository for managing deployable applications.

use std::future::Future;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::model::{App, NewApp, UpdateApp};
use crate::{PgConnection, PgError, PgResult, schema};

/// Repository for application database operations.
pub trait AppRepository {
    /// Creates a new application record.
    fn create_app(&mut self, new_app: NewApp) -> impl Future<Output = PgResult<App>> + Send;

    /// Finds an application by its unique identifier.
    fn find_app_by_id(&mut self, app_id: i64) -> impl Future<Output = PgResult<Option<App>>> + Send;

    /// Finds an application by its name.
    fn find_app_by_name(
        &mut self,
        app_name: &str,
    ) -> impl Future<Output = PgResult<Option<App>>> + Send;

    /// Updates an application with new data.
    fn update_app(
        &mut self,
        app_id: i64,
        updates: UpdateApp,
    ) -> impl Future<Output = PgResult<App>> + Send;
}

impl AppRepository for PgConnection {
    async fn create_app(&mut self, new_app: NewApp) -> PgResult<App> {
        use schema::app;

        let app = diesel::insert_into(app::table)
            .values(&new_app)
            .returning(App::as_returning())
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        Ok(app)
    }

    async fn find_app_by_id(&mut self, app_id: i64) -> PgResult<Option<App>> {
        use schema::app::{self, dsl};

        let app = app::table
            .filter(dsl::id.eq(app_id))
            .select(App::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(app)
    }

    async fn find_app_by_name(&mut self, app_name: &str) -> PgResult<Option<App>> {
        use schema::app::{self, dsl};

        let app = app::table
            .filter(dsl::app_name.eq(app_name))
            .select(App::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(app)
    }

    async fn update_app(&mut self, app_id: i64, updates: UpdateApp) -> PgResult<App> {
        use diesel::dsl::now;
        use schema::app::{self, dsl};

        let app = diesel::update(app::table.filter(dsl::id.eq(app_id)))
            .set((&updates, dsl::updated_on.eq(now)))
            .returning(App::as_returning())
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        Ok(app)
    }
}
