//! Request and result envelopes for a publish sequence.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::correlation::CorrelationId;
use crate::error::{ExhaustedPublish, SequenceAborted};

/// One unit of work handed to the executor: where to publish, what to
/// publish, and the id the whole sequence logs under.
#[derive(Debug, Clone)]
pub struct PublishRequest<P> {
    pub topic: String,
    pub key: Option<String>,
    pub payload: P,
    pub correlation_id: CorrelationId,
}

impl<P> PublishRequest<P> {
    /// Build a request with a freshly generated correlation id.
    pub fn new(topic: impl Into<String>, key: Option<String>, payload: P) -> Self {
        Self::with_correlation(topic, key, payload, CorrelationId::generate())
    }

    /// Build a request carrying an existing correlation id.
    pub fn with_correlation(
        topic: impl Into<String>,
        key: Option<String>,
        payload: P,
        correlation_id: CorrelationId,
    ) -> Self {
        Self { topic: topic.into(), key, payload, correlation_id }
    }
}

/// Broker-side metadata for a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub topic: String,
    pub partition: Option<i32>,
    pub offset: Option<i64>,
}

impl Delivery {
    pub fn new(topic: impl Into<String>) -> Self {
        Self { topic: topic.into(), partition: None, offset: None }
    }

    pub fn with_partition(mut self, partition: i32) -> Self {
        self.partition = Some(partition);
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Terminal result of one publish sequence.
///
/// Exactly one outcome is produced per sequence, no matter how many internal
/// attempts ran. `DeadLettered` means an exhaustion handler routed the
/// payload to a dead-letter topic; `Failed` means exhaustion with no routing.
#[derive(Debug)]
pub enum PublishOutcome<P, E> {
    Success { delivery: Delivery, correlation_id: CorrelationId },
    Failed { failure: Arc<ExhaustedPublish<P, E>> },
    DeadLettered { topic: String, failure: Arc<ExhaustedPublish<P, E>> },
}

impl<P, E> PublishOutcome<P, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn is_dead_lettered(&self) -> bool {
        matches!(self, Self::DeadLettered { .. })
    }

    /// Correlation id of the sequence, whatever the terminal state.
    pub fn correlation_id(&self) -> &CorrelationId {
        match self {
            Self::Success { correlation_id, .. } => correlation_id,
            Self::Failed { failure } | Self::DeadLettered { failure, .. } => {
                failure.correlation_id()
            }
        }
    }

    /// Broker metadata, present only on success.
    pub fn delivery(&self) -> Option<&Delivery> {
        match self {
            Self::Success { delivery, .. } => Some(delivery),
            _ => None,
        }
    }

    /// The exhaustion record, present on `Failed` and `DeadLettered`.
    pub fn failure(&self) -> Option<&ExhaustedPublish<P, E>> {
        match self {
            Self::Failed { failure } | Self::DeadLettered { failure, .. } => Some(failure),
            _ => None,
        }
    }

    /// The dead-letter topic the payload was routed to, if any.
    pub fn dead_letter_topic(&self) -> Option<&str> {
        match self {
            Self::DeadLettered { topic, .. } => Some(topic),
            _ => None,
        }
    }
}

/// Pending handle for a dispatched sequence.
///
/// Returned immediately by `RetryExecutor::dispatch`; resolves exactly once
/// with the sequence's outcome. Dropping the handle does not cancel the
/// sequence. If the driving task dies before settling, the handle resolves
/// with [`SequenceAborted`] rather than hanging.
#[derive(Debug)]
pub struct PublishHandle<P, E> {
    rx: oneshot::Receiver<PublishOutcome<P, E>>,
    correlation_id: CorrelationId,
}

impl<P, E> PublishHandle<P, E> {
    pub(crate) fn new(
        rx: oneshot::Receiver<PublishOutcome<P, E>>,
        correlation_id: CorrelationId,
    ) -> Self {
        Self { rx, correlation_id }
    }

    /// Correlation id of the in-flight sequence, available before it settles.
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }
}

impl<P, E> Future for PublishHandle<P, E> {
    type Output = Result<PublishOutcome<P, E>, SequenceAborted>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(Ok(outcome)),
            Poll::Ready(Err(_)) => Poll::Ready(Err(SequenceAborted {
                correlation_id: this.correlation_id.clone(),
            })),
            Poll::Pending => Poll::Pending,
        }
    }
}
