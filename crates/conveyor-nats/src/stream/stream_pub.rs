//! Generic typed stream publisher.

use std::marker::PhantomData;
use std::time::Duration;

use async_nats::HeaderMap;
use async_nats::jetstream::{Context, stream};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::{Error, Result, TRACING_TARGET_STREAM};

/// Header inspected by JetStream for server-side message de-duplication.
const MSG_ID_HEADER: &str = "Nats-Msg-Id";

/// Ensure a stream exists, creating it when missing.
pub(super) async fn ensure_stream(
    jetstream: &Context,
    stream_name: &str,
    subjects: Vec<String>,
    max_age: Option<Duration>,
) -> Result<()> {
    match jetstream.get_stream(stream_name).await {
        Ok(_) => {
            debug!(
                target: TRACING_TARGET_STREAM,
                stream = %stream_name,
                "Using existing stream"
            );
        }
        Err(_) => {
            // Stream doesn't exist, create it
            let stream_config = stream::Config {
                name: stream_name.to_string(),
                description: Some(format!("Event stream: {}", stream_name)),
                subjects,
                max_age: max_age.unwrap_or_default(),
                ..Default::default()
            };

            debug!(
                target: TRACING_TARGET_STREAM,
                stream = %stream_name,
                max_age = ?max_age,
                "Creating new stream"
            );
            jetstream
                .create_stream(stream_config)
                .await
                .map_err(|e| Error::stream_error(stream_name, e.to_string()))?;
        }
    }

    Ok(())
}

/// Typed publisher bound to a single JetStream stream.
#[derive(Debug, Clone)]
pub struct StreamPublisher<T> {
    jetstream: Context,
    stream_name: String,
    _marker: PhantomData<T>,
}

impl<T> StreamPublisher<T>
where
    T: Serialize + Send + Sync + 'static,
{
    /// Create a new stream publisher, creating the stream when missing.
    pub(crate) async fn new(
        jetstream: &Context,
        stream_name: &str,
        subjects: Vec<String>,
        max_age: Option<Duration>,
    ) -> Result<Self> {
        ensure_stream(jetstream, stream_name, subjects, max_age).await?;

        Ok(Self {
            jetstream: jetstream.clone(),
            stream_name: stream_name.to_string(),
            _marker: PhantomData,
        })
    }

    /// Publish a payload to the given subject.
    #[instrument(skip(self, payload), target = TRACING_TARGET_STREAM)]
    pub async fn publish(&self, subject: &str, payload: &T) -> Result<()> {
        let bytes = serde_json::to_vec(payload)?;
        let payload_size = bytes.len();

        self.jetstream
            .publish(subject.to_string(), bytes.into())
            .await
            .map_err(|e| Error::delivery_failed(subject, e.to_string()))?
            .await
            .map_err(|e| Error::operation("stream_publish", e.to_string()))?;

        debug!(
            target: TRACING_TARGET_STREAM,
            subject = %subject,
            stream = %self.stream_name,
            payload_size = payload_size,
            "Published event"
        );
        Ok(())
    }

    /// Publish a payload with a message id for server-side de-duplication.
    ///
    /// JetStream drops messages whose id was already seen within the stream's
    /// duplicate window, so republishing the same logical event is safe.
    #[instrument(skip(self, payload), target = TRACING_TARGET_STREAM)]
    pub async fn publish_with_id(
        &self,
        subject: &str,
        payload: &T,
        message_id: &str,
    ) -> Result<()> {
        let bytes = serde_json::to_vec(payload)?;
        let payload_size = bytes.len();

        let mut headers = HeaderMap::new();
        headers.insert(MSG_ID_HEADER, message_id);

        self.jetstream
            .publish_with_headers(subject.to_string(), headers, bytes.into())
            .await
            .map_err(|e| Error::delivery_failed(subject, e.to_string()))?
            .await
            .map_err(|e| Error::operation("stream_publish", e.to_string()))?;

        debug!(
            target: TRACING_TARGET_STREAM,
            subject = %subject,
            stream = %self.stream_name,
            message_id = %message_id,
            payload_size = payload_size,
            "Published event with message id"
        );
        Ok(())
    }

    /// Publish multiple payloads to the given subject.
    #[instrument(skip(self, payloads), target = TRACING_TARGET_STREAM)]
    pub async fn publish_batch(&self, subject: &str, payloads: &[T]) -> Result<()> {
        let count = payloads.len();
        for payload in payloads {
            self.publish(subject, payload).await?;
        }

        debug!(
            target: TRACING_TARGET_STREAM,
            subject = %subject,
            stream = %self.stream_name,
            count = count,
            "Published batch of events"
        );
        Ok(())
    }

    /// Returns the stream name.
    #[must_use]
    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }
}
