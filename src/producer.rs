//! Publish collaborator seam and the retrying producer front door.
//!
//! [`Publisher`] is the boundary to the broker client: one async publish of
//! one payload to one topic, returning delivery metadata or the broker's
//! error. Everything broker-specific (wire protocol, partitioning,
//! durability) lives behind it.
//!
//! [`RetryingProducer`] is what applications hold: it establishes the
//! correlation id, validates the request, and dispatches the attempt loop
//! onto the scheduler pool, returning a pending handle immediately.

use std::sync::Arc;

use async_trait::async_trait;

use crate::correlation::CorrelationId;
use crate::error::InvalidRequest;
use crate::outcome::{Delivery, PublishHandle, PublishOutcome, PublishRequest};
use crate::retry::RetryExecutor;
use crate::scheduler::RetryScheduler;

/// Abstraction for publishing payloads to a message broker.
#[async_trait]
pub trait Publisher<P>: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Send one payload to a topic.
    ///
    /// A `None` key leaves partition selection to the broker; a `Some` key
    /// routes consistently to the same partition.
    async fn publish(
        &self,
        topic: &str,
        key: Option<&str>,
        payload: &P,
    ) -> Result<Delivery, Self::Error>;
}

/// Producer that drives every publish through the retry executor.
#[derive(Debug)]
pub struct RetryingProducer<P, Pub>
where
    Pub: Publisher<P>,
{
    publisher: Arc<Pub>,
    executor: Arc<RetryExecutor<P, Pub::Error>>,
    scheduler: RetryScheduler,
}

impl<P, Pub> RetryingProducer<P, Pub>
where
    P: Clone + Send + Sync + 'static,
    Pub: Publisher<P> + 'static,
{
    pub fn new(
        publisher: Arc<Pub>,
        executor: Arc<RetryExecutor<P, Pub::Error>>,
        scheduler: RetryScheduler,
    ) -> Self {
        Self { publisher, executor, scheduler }
    }

    /// Publish with a freshly generated correlation id.
    ///
    /// Returns immediately; the sequence runs on the scheduler pool and the
    /// handle settles exactly once with the terminal outcome.
    pub fn send(
        &self,
        topic: impl Into<String>,
        key: Option<String>,
        payload: P,
    ) -> Result<PublishHandle<P, Pub::Error>, InvalidRequest> {
        self.send_with_correlation(topic, key, payload, CorrelationId::generate())
    }

    /// Publish under an existing correlation id, e.g. one carried in from an
    /// inbound request context.
    pub fn send_with_correlation(
        &self,
        topic: impl Into<String>,
        key: Option<String>,
        payload: P,
        correlation_id: CorrelationId,
    ) -> Result<PublishHandle<P, Pub::Error>, InvalidRequest> {
        let (request, work) = self.prepare(topic, key, payload, correlation_id)?;
        Ok(self.executor.dispatch(&self.scheduler, request, work))
    }

    /// Drive the sequence inline on the current task and await the outcome.
    pub async fn send_now(
        &self,
        topic: impl Into<String>,
        key: Option<String>,
        payload: P,
    ) -> Result<PublishOutcome<P, Pub::Error>, InvalidRequest> {
        let (request, work) =
            self.prepare(topic, key, payload, CorrelationId::generate())?;
        Ok(self.executor.execute(request, work).await)
    }

    #[allow(clippy::type_complexity)]
    fn prepare(
        &self,
        topic: impl Into<String>,
        key: Option<String>,
        payload: P,
        correlation_id: CorrelationId,
    ) -> Result<
        (
            PublishRequest<P>,
            impl FnMut() -> futures::future::BoxFuture<'static, Result<Delivery, Pub::Error>>
                + Send
                + 'static,
        ),
        InvalidRequest,
    > {
        let topic = topic.into();
        if topic.trim().is_empty() {
            return Err(InvalidRequest::BlankTopic);
        }

        let request = PublishRequest::with_correlation(
            topic.clone(),
            key.clone(),
            payload.clone(),
            correlation_id,
        );

        let publisher = Arc::clone(&self.publisher);
        let shared_payload = Arc::new(payload);
        let work = move || -> futures::future::BoxFuture<'static, Result<Delivery, Pub::Error>> {
            let publisher = Arc::clone(&publisher);
            let topic = topic.clone();
            let key = key.clone();
            let payload = Arc::clone(&shared_payload);
            Box::pin(async move { publisher.publish(&topic, key.as_deref(), &payload).await })
        };

        Ok((request, work))
    }
}
