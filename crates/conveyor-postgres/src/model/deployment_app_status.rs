//! Deployment app status model for PostgreSQL database operations.

use diesel::prelude::*;
use jiff_diesel::Timestamp;

use crate::schema::deployment_app_status;

/// Last observed health of an application in one environment.
///
/// Written by the reconciler whenever a status poll returns, regardless
/// of whether the poll moved any runner forward.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = deployment_app_status)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DeploymentAppStatus {
    /// Unique record identifier.
    pub id: i64,
    /// Application the record describes.
    pub app_id: i64,
    /// Environment the record describes.
    pub environment_id: i64,
    /// Raw health string reported by the release backend.
    pub status: String,
    /// When the record was created.
    pub created_on: Timestamp,
    /// When the record was last updated.
    pub updated_on: Timestamp,
}

/// Data for creating a new deployment app status record.
#[derive(Debug, Default, Clone, Insertable)]
#[diesel(table_name = deployment_app_status)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewDeploymentAppStatus {
    /// Application (required).
    pub app_id: i64,
    /// Environment (required).
    pub environment_id: i64,
    /// Reported health (required).
    pub status: String,
}
