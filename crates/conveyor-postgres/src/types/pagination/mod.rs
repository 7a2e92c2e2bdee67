//! Pagination types for database queries.
//!
//! This module provides offset-based pagination, used by the reconciler
//! sweeps to walk large result sets in bounded slices.

mod offset;

pub use offset::{OffsetPage, OffsetPagination};
