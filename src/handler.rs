//! Exhaustion handlers: observers invoked when a sequence runs out of
//! attempts.
//!
//! Handlers run synchronously with respect to the sequence, in registration
//! order, all against the same immutable [`ExhaustedPublish`] record. A
//! handler error is logged and contained; it never prevents later handlers
//! from running and never masks the original exhaustion failure.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ExhaustedPublish;
use crate::producer::Publisher;
use crate::routing::DlqRouting;

/// Errors raised inside a handler; contained by the executor.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// What a handler did with the exhausted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Failure noted; nothing was routed anywhere.
    Observed,
    /// Payload was published to the given dead-letter topic. The first such
    /// disposition turns the sequence outcome into `DeadLettered`.
    DeadLettered { topic: String },
}

/// Callback for when retries are exhausted and the publish still failed.
///
/// Multiple handlers can be registered; all are invoked, in order.
#[async_trait]
pub trait ExhaustedHandler<P, E>: Send + Sync {
    async fn on_exhausted(
        &self,
        failure: &ExhaustedPublish<P, E>,
    ) -> Result<Disposition, HandlerError>;
}

/// Logs exhausted sequences for operational visibility.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHandler;

#[async_trait]
impl<P, E> ExhaustedHandler<P, E> for LoggingHandler
where
    P: std::fmt::Debug + Send + Sync,
    E: std::error::Error + Send + Sync,
{
    async fn on_exhausted(
        &self,
        failure: &ExhaustedPublish<P, E>,
    ) -> Result<Disposition, HandlerError> {
        tracing::error!(
            topic = %failure.topic(),
            key = ?failure.key(),
            correlation_id = %failure.correlation_id(),
            occurred_at = ?failure.occurred_at(),
            payload = ?failure.payload(),
            error = %failure.cause(),
            "exhausted retries"
        );
        Ok(Disposition::Observed)
    }
}

/// Publishes exhausted payloads to a dead-letter topic.
///
/// One-shot: the dead-letter publish goes straight through the underlying
/// publisher, never back through a retry executor.
#[derive(Debug)]
pub struct DeadLetterHandler<Pub> {
    publisher: Arc<Pub>,
    routing: DlqRouting,
}

impl<Pub> DeadLetterHandler<Pub> {
    pub fn new(publisher: Arc<Pub>, routing: DlqRouting) -> Self {
        Self { publisher, routing }
    }
}

#[async_trait]
impl<P, E, Pub> ExhaustedHandler<P, E> for DeadLetterHandler<Pub>
where
    P: Send + Sync,
    E: std::error::Error + Send + Sync,
    Pub: Publisher<P>,
{
    async fn on_exhausted(
        &self,
        failure: &ExhaustedPublish<P, E>,
    ) -> Result<Disposition, HandlerError> {
        let dlq_topic = self.routing.resolve(failure.topic());
        tracing::warn!(
            dlq_topic = %dlq_topic,
            topic = %failure.topic(),
            key = ?failure.key(),
            correlation_id = %failure.correlation_id(),
            "routing exhausted publish to dead-letter topic"
        );
        self.publisher
            .publish(&dlq_topic, failure.key(), failure.payload())
            .await
            .map_err(|e| -> HandlerError { Box::new(e) })?;
        Ok(Disposition::DeadLettered { topic: dlq_topic })
    }
}
