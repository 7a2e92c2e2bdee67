use std::borrow::Cow;
use std::error::Error;

use conveyor_postgres::PgError;

/// Specialized [`Result`] alias for engine operations.
///
/// [`Result`]: std::result::Result
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Errors that can occur during engine operation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Stream subscription failed.
    #[error("subscription failed: {0}")]
    Subscription(#[from] conveyor_nats::Error),

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] PgError),

    /// Release driver call failed outside the classified trigger path.
    #[error("driver error: {0}")]
    Driver(#[from] conveyor_drivers::DriverError),

    /// The message or request referenced state that does not exist.
    ///
    /// Validation failures are never retried; the worker acknowledges the
    /// message and moves on.
    #[error("invalid request: {message}")]
    Validation {
        /// Description of what failed validation.
        message: Cow<'static, str>,
    },

    /// Job processing failed.
    #[error("job processing failed: {message}")]
    Processing {
        /// Description of what went wrong.
        message: Cow<'static, str>,
        /// Underlying cause, if any.
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },
}

impl EngineError {
    /// Creates a validation error with the given message.
    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a processing error with the given message.
    pub fn processing(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Processing {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a processing error with a message and an underlying cause.
    pub fn processing_with_source(
        message: impl Into<Cow<'static, str>>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns whether redelivering the message could succeed.
    ///
    /// Only transient store errors qualify. A terminal-transition refusal,
    /// a validation failure, or a driver-reported failure will fail the
    /// same way on every delivery.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(err) => err.is_transient(),
            Self::Driver(err) => err.is_transient(),
            Self::Subscription(_) | Self::Validation { .. } | Self::Processing { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use conveyor_postgres::types::WorkflowRunnerStatus;

    use super::*;

    #[test]
    fn validation_errors_are_not_retryable() {
        let err = EngineError::validation("unknown workflow runner 42");
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "invalid request: unknown workflow runner 42");
    }

    #[test]
    fn terminal_transition_is_not_retryable() {
        let err = EngineError::Database(PgError::TerminalTransition {
            runner_id: 7,
            current: WorkflowRunnerStatus::Failed,
            requested: WorkflowRunnerStatus::Succeeded,
        });
        assert!(!err.is_retryable());
    }

    #[test]
    fn transient_driver_errors_are_retryable() {
        let err = EngineError::Driver(conveyor_drivers::DriverError::unreachable("no route"));
        assert!(err.is_retryable());

        let err = EngineError::Driver(conveyor_drivers::DriverError::reported_failure("oom"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn processing_error_preserves_source() {
        let cause = std::io::Error::other("disk gone");
        let err = EngineError::processing_with_source("Failed to stage artifact", cause);
        assert!(std::error::Error::source(&err).is_some());
    }
}
