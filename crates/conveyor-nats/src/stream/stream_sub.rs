//! Generic typed stream subscriber with durable pull consumers.

use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use std::time::Duration;

use async_nats::jetstream::consumer::{PullConsumer, pull};
use async_nats::jetstream::{AckKind, Context, Message};
use futures::Stream;
use pin_project_lite::pin_project;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::stream_pub::ensure_stream;
use crate::{Error, Result, TRACING_TARGET_STREAM};

/// How long a delivered message may stay unacknowledged before redelivery.
const ACK_WAIT: Duration = Duration::from_secs(300);

/// Maximum delivery attempts per message.
const MAX_DELIVER: i64 = 3;

/// Typed subscriber bound to a durable pull consumer on one stream.
///
/// The consumer is durable: position survives restarts, and unacknowledged
/// messages are redelivered a bounded number of times before being dropped.
#[derive(Debug, Clone)]
pub struct StreamSubscriber<T> {
    jetstream: Context,
    stream_name: String,
    consumer_name: String,
    filter_subject: Option<String>,
    _marker: PhantomData<T>,
}

impl<T> StreamSubscriber<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    /// Create a new stream subscriber, creating the stream when missing.
    pub(crate) async fn new(
        jetstream: &Context,
        stream_name: &str,
        subjects: Vec<String>,
        consumer_name: &str,
        max_age: Option<Duration>,
    ) -> Result<Self> {
        ensure_stream(jetstream, stream_name, subjects, max_age).await?;

        Ok(Self {
            jetstream: jetstream.clone(),
            stream_name: stream_name.to_string(),
            consumer_name: consumer_name.to_string(),
            filter_subject: None,
            _marker: PhantomData,
        })
    }

    /// Narrow the consumer to a single subject within the stream.
    #[must_use]
    pub fn with_filter_subject(mut self, filter_subject: impl Into<String>) -> Self {
        self.filter_subject = Some(filter_subject.into());
        self
    }

    /// Subscribe to the stream, returning a continuous message stream.
    #[instrument(skip(self), target = TRACING_TARGET_STREAM)]
    pub async fn subscribe(&self) -> Result<TypedMessageStream<T>> {
        let consumer = self.create_consumer().await?;
        let messages = consumer
            .messages()
            .await
            .map_err(|e| Error::consumer_error(&self.consumer_name, e.to_string()))?;

        Ok(TypedMessageStream {
            inner: messages,
            _marker: PhantomData,
        })
    }

    /// Fetch up to `max_messages` currently pending messages.
    ///
    /// Returns immediately once the pending messages are drained, making it
    /// suitable for poll-style workers.
    #[instrument(skip(self), target = TRACING_TARGET_STREAM)]
    pub async fn fetch(&self, max_messages: usize) -> Result<TypedBatchStream<T>> {
        let consumer = self.create_consumer().await?;
        let batch = consumer
            .fetch()
            .max_messages(max_messages)
            .messages()
            .await
            .map_err(|e| Error::operation("message_fetch", e.to_string()))?;

        Ok(TypedBatchStream {
            inner: batch,
            _marker: PhantomData,
        })
    }

    /// Returns the stream name.
    #[must_use]
    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    /// Returns the consumer name.
    #[must_use]
    pub fn consumer_name(&self) -> &str {
        &self.consumer_name
    }

    /// Create or look up the durable pull consumer.
    async fn create_consumer(&self) -> Result<PullConsumer> {
        let mut consumer_config = pull::Config {
            name: Some(self.consumer_name.clone()),
            durable_name: Some(self.consumer_name.clone()),
            description: Some(format!("Durable consumer for {}", self.stream_name)),
            ack_wait: ACK_WAIT,
            max_deliver: MAX_DELIVER,
            ..Default::default()
        };

        if let Some(filter_subject) = &self.filter_subject {
            consumer_config.filter_subject = filter_subject.clone();
        }

        let stream = self
            .jetstream
            .get_stream(&self.stream_name)
            .await
            .map_err(|e| Error::stream_error(&self.stream_name, e.to_string()))?;

        let consumer = stream
            .create_consumer(consumer_config)
            .await
            .map_err(|e| Error::consumer_error(&self.consumer_name, e.to_string()))?;

        debug!(
            target: TRACING_TARGET_STREAM,
            consumer = %self.consumer_name,
            stream = %self.stream_name,
            filter_subject = ?self.filter_subject,
            "Created durable consumer"
        );
        Ok(consumer)
    }
}

/// A decoded message together with its acknowledgement handle.
#[derive(Debug)]
pub struct TypedMessage<T> {
    payload: T,
    message: Message,
}

impl<T> TypedMessage<T> {
    /// Borrow the decoded payload.
    #[must_use]
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Consume the message, returning the decoded payload.
    #[must_use]
    pub fn into_payload(self) -> T {
        self.payload
    }

    /// Subject the message was published to.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.message.subject.as_str()
    }

    /// Delivery attempt number for this message, starting at 1.
    #[must_use]
    pub fn delivery_count(&self) -> Option<i64> {
        self.message.info().ok().map(|info| info.delivered)
    }

    /// Acknowledge the message, removing it from the pending set.
    pub async fn ack(&self) -> Result<()> {
        self.message
            .ack()
            .await
            .map_err(|e| Error::Ack(e.to_string()))
    }

    /// Negatively acknowledge, requesting redelivery after an optional delay.
    pub async fn nak(&self, delay: Option<Duration>) -> Result<()> {
        self.message
            .ack_with(AckKind::Nak(delay))
            .await
            .map_err(|e| Error::Ack(e.to_string()))
    }

    /// Terminate the message, preventing any further redelivery.
    pub async fn term(&self) -> Result<()> {
        self.message
            .ack_with(AckKind::Term)
            .await
            .map_err(|e| Error::Ack(e.to_string()))
    }
}

pin_project! {
    /// Continuous stream of decoded messages from a durable consumer.
    pub struct TypedMessageStream<T> {
        #[pin]
        inner: pull::Stream,
        _marker: PhantomData<T>,
    }
}

impl<T> Stream for TypedMessageStream<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    type Item = Result<TypedMessage<T>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match this.inner.poll_next(cx) {
            Poll::Ready(Some(Ok(message))) => {
                let item = match serde_json::from_slice::<T>(&message.payload) {
                    Ok(payload) => Ok(TypedMessage { payload, message }),
                    Err(e) => Err(Error::Serialization(e)),
                };
                Poll::Ready(Some(item))
            }
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(Error::JetstreamMessage(e.into())))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

pin_project! {
    /// Bounded stream of decoded messages from a single fetch.
    pub struct TypedBatchStream<T> {
        #[pin]
        inner: pull::Batch,
        _marker: PhantomData<T>,
    }
}

impl<T> Stream for TypedBatchStream<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    type Item = Result<TypedMessage<T>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match this.inner.poll_next(cx) {
            Poll::Ready(Some(Ok(message))) => {
                let item = match serde_json::from_slice::<T>(&message.payload) {
                    Ok(payload) => Ok(TypedMessage { payload, message }),
                    Err(e) => Err(Error::Serialization(e)),
                };
                Poll::Ready(Some(item))
            }
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(Error::JetstreamMessage(e.into())))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
