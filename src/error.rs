//! Error types for publish retry orchestration.

use std::fmt;
use std::time::SystemTime;

use crate::correlation::CorrelationId;
use crate::outcome::PublishRequest;

/// Immutable record of a publish sequence that consumed its attempt budget.
///
/// Built exactly once per sequence, when the final attempt fails. Every
/// registered exhaustion handler receives the same record during fan-out;
/// none may mutate it. The correlation id is copied in by value when the
/// record is built, never re-read from any shared context afterwards.
#[derive(Debug)]
pub struct ExhaustedPublish<P, E> {
    topic: String,
    key: Option<String>,
    payload: P,
    correlation_id: CorrelationId,
    cause: E,
    occurred_at: SystemTime,
}

impl<P, E> ExhaustedPublish<P, E> {
    /// Wrap the request that exhausted its budget together with the final
    /// attempt's error. Timestamped at construction.
    pub fn new(request: PublishRequest<P>, cause: E) -> Self {
        Self {
            topic: request.topic,
            key: request.key,
            payload: request.payload,
            correlation_id: request.correlation_id,
            cause,
            occurred_at: SystemTime::now(),
        }
    }

    /// Topic the original publish targeted.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Partitioning key of the original publish, if any.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// The payload that failed to publish.
    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// The error returned by the final attempt.
    pub fn cause(&self) -> &E {
        &self.cause
    }

    /// When exhaustion was recorded.
    pub fn occurred_at(&self) -> SystemTime {
        self.occurred_at
    }
}

impl<P, E> fmt::Display for ExhaustedPublish<P, E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "publish retries exhausted [topic={}, key={:?}, correlation_id={}]: {}",
            self.topic, self.key, self.correlation_id, self.cause
        )
    }
}

impl<P, E> std::error::Error for ExhaustedPublish<P, E>
where
    P: fmt::Debug,
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// A dispatched sequence died before settling its outcome.
///
/// Only produced when the driving task is torn down abnormally (scheduler
/// shutdown, task panic); the abort is surfaced through the publish handle
/// instead of being silently dropped.
#[derive(Debug, Clone, thiserror::Error)]
#[error("publish sequence aborted before settling [correlation_id={correlation_id}]")]
pub struct SequenceAborted {
    pub correlation_id: CorrelationId,
}

/// Rejected before the first attempt was ever made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidRequest {
    #[error("topic must not be blank")]
    BlankTopic,
}
