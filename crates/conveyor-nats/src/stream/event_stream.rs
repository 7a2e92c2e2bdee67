//! Event stream configuration for NATS JetStream.

use std::time::Duration;

/// Marker trait for event streams.
///
/// This trait defines the configuration for a NATS JetStream stream.
pub trait EventStream: Clone + Send + Sync + 'static {
    /// Stream name used in NATS JetStream.
    const NAME: &'static str;

    /// Subject for publishing/subscribing to this stream.
    const SUBJECT: &'static str;

    /// Maximum age for messages in this stream.
    /// Returns `None` for streams where messages should not expire.
    const MAX_AGE: Option<Duration>;

    /// Default consumer name for this stream.
    const CONSUMER_NAME: &'static str;
}

/// Stream for asynchronous deployment trigger requests.
///
/// Messages expire after 1 day. A deploy request that has not been picked
/// up within that window is stale and must be re-issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeployRequestStream;

impl EventStream for DeployRequestStream {
    const CONSUMER_NAME: &'static str = "cd-trigger-worker";
    const MAX_AGE: Option<Duration> = Some(Duration::from_secs(24 * 60 * 60));
    const NAME: &'static str = "CD_TRIGGERS";
    const SUBJECT: &'static str = "cd.trigger.deploy";
}

/// Stream for on-demand pipeline status sync requests.
///
/// Messages expire after 1 hour. The periodic reconciler sweeps cover
/// anything older than that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StatusSyncStream;

impl EventStream for StatusSyncStream {
    const CONSUMER_NAME: &'static str = "argo-status-worker";
    const MAX_AGE: Option<Duration> = Some(Duration::from_secs(60 * 60));
    const NAME: &'static str = "ARGO_STATUS_SYNC";
    const SUBJECT: &'static str = "cd.status.sync";
}

/// Stream for CI build completion events.
///
/// Messages expire after 7 days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CiCompleteStream;

impl EventStream for CiCompleteStream {
    const CONSUMER_NAME: &'static str = "ci-complete-worker";
    const MAX_AGE: Option<Duration> = Some(Duration::from_secs(7 * 24 * 60 * 60));
    const NAME: &'static str = "CI_COMPLETE";
    const SUBJECT: &'static str = "ci.complete";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_request_stream() {
        assert_eq!(DeployRequestStream::NAME, "CD_TRIGGERS");
        assert_eq!(DeployRequestStream::SUBJECT, "cd.trigger.deploy");
        assert_eq!(
            DeployRequestStream::MAX_AGE,
            Some(Duration::from_secs(24 * 60 * 60))
        );
        assert_eq!(DeployRequestStream::CONSUMER_NAME, "cd-trigger-worker");
    }

    #[test]
    fn test_status_sync_stream() {
        assert_eq!(StatusSyncStream::NAME, "ARGO_STATUS_SYNC");
        assert_eq!(StatusSyncStream::SUBJECT, "cd.status.sync");
        assert_eq!(StatusSyncStream::MAX_AGE, Some(Duration::from_secs(60 * 60)));
        assert_eq!(StatusSyncStream::CONSUMER_NAME, "argo-status-worker");
    }

    #[test]
    fn test_ci_complete_stream() {
        assert_eq!(CiCompleteStream::NAME, "CI_COMPLETE");
        assert_eq!(CiCompleteStream::SUBJECT, "ci.complete");
        assert_eq!(
            CiCompleteStream::MAX_AGE,
            Some(Duration::from_secs(7 * 24 * 60 * 60))
        );
        assert_eq!(CiCompleteStream::CONSUMER_NAME, "ci-complete-worker");
    }
}
