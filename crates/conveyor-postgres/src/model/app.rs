//! Application model for PostgreSQL database operations.

use diesel::prelude::*;
use jiff_diesel::Timestamp;

use crate::schema::app;

/// Application model representing a deployable application.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = app)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct App {
    /// Unique application identifier.
    pub id: i64,
    /// Human-readable application name.
    pub app_name: String,
    /// Owning team, if any.
    pub team_id: Option<i64>,
    /// Whether the application is active.
    pub active: bool,
    /// When the application was created.
    pub created_on: Timestamp,
    /// When the application was last updated.
    pub updated_on: Timestamp,
}

/// Data for creating a new application.
#[derive(Debug, Default, Clone, Insertable)]
#[diesel(table_name = app)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewApp {
    /// Application name (required).
    pub app_name: String,
    /// Owning team.
    pub team_id: Option<i64>,
    /// Active flag.
    pub active: Option<bool>,
}

/// Data for updating an application.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = app)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UpdateApp {
    /// Application name.
    pub app_name: Option<String>,
    /// Active flag.
    pub active: Option<bool>,
}

impl App {
    /// Returns whether the application is active.
    pub fn is_active(&self) -> bool {
        self.active
    }
}
