//! Constants used throughout the application.

/// Database-related constants.
pub mod database {
    /// Default pagination limit.
    pub const DEFAULT_PAGE_SIZE: i64 = 50;

    /// Maximum pagination limit.
    pub const MAX_PAGE_SIZE: i64 = 1000;
}

/// Constants related to deployment workflows and their runners.
pub mod workflow {
    /// User id recorded for actions performed by the engine itself.
    pub const SYSTEM_USER_ID: i64 = 1;

    /// Number of hours a non-terminal helm runner stays eligible for
    /// status reconciliation before it is abandoned.
    pub const HELM_RECONCILE_WINDOW_HOURS: i64 = 24;

    /// Maximum age in hours for a GitOps deployment to be picked up by
    /// the stuck-pipeline sweep.
    pub const ARGO_RECONCILE_WINDOW_HOURS: i64 = 24;
}

/// Constants related to status timelines.
pub mod timeline {
    /// Maximum length of a status detail before it is truncated.
    pub const MAX_STATUS_DETAIL_LENGTH: usize = 250;

    /// Minimum number of seconds between two recorded status syncs for
    /// the same runner.
    pub const SYNC_GUARD_SECONDS: i64 = 5;
}
