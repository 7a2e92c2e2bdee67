//! Release driver error types.

use thiserror::Error;

/// Result type for release driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// Release driver errors.
///
/// The engine treats [`DriverError::Unreachable`] and [`DriverError::Timeout`]
/// as transient: the runner stays non-terminal and the reconciler retries on
/// the next tick. Every other variant is terminal for the operation that
/// produced it.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The driver endpoint did not answer.
    #[error("driver unreachable: {0}")]
    Unreachable(String),

    /// The driver answered and reported that the operation failed.
    #[error("driver reported failure: {0}")]
    ReportedFailure(String),

    /// The request exceeded its deadline.
    #[error("driver request timed out: {0}")]
    Timeout(String),

    /// The release or application does not exist on the backend.
    #[error("release not found: {0}")]
    ReleaseNotFound(String),

    /// The driver answered with a body the client could not interpret.
    #[error("invalid driver response: {0}")]
    InvalidResponse(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DriverError {
    /// Creates an unreachable error.
    pub fn unreachable(msg: impl Into<String>) -> Self {
        Self::Unreachable(msg.into())
    }

    /// Creates a reported failure error.
    pub fn reported_failure(msg: impl Into<String>) -> Self {
        Self::ReportedFailure(msg.into())
    }

    /// Creates a timeout error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Creates a release not found error.
    pub fn release_not_found(name: impl Into<String>) -> Self {
        Self::ReleaseNotFound(name.into())
    }

    /// Creates an invalid response error.
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Creates an invalid config error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Returns whether the driver could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }

    /// Returns whether the request ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Returns whether a retry on a later tick may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Timeout(_))
    }
}

impl From<reqwest::Error> for DriverError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(err.to_string())
        } else if err.is_connect() {
            Self::unreachable(err.to_string())
        } else if err.is_decode() {
            Self::invalid_response(err.to_string())
        } else if err.is_builder() {
            Self::invalid_config(err.to_string())
        } else {
            Self::unreachable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_response(err.to_string())
    }
}
