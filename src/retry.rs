//! Retry executor for fallible async publish operations.
//!
//! Semantics:
//! - `max_attempts` counts total attempts (initial try + retries); a budget
//!   of 1 means exhaustion fires on the first failure.
//! - Attempts within one sequence are strictly serialized: attempt `n + 1`
//!   never starts before attempt `n` has settled.
//! - The attempt counter is explicit loop state, not closure capture depth,
//!   so deep retry chains neither grow the stack nor accumulate closures.
//! - On exhaustion a single immutable failure record is built and fanned out
//!   to every registered handler in registration order before the outcome
//!   settles; a handler error is contained and logged.
//! - Each sequence settles exactly once, as `Success`, `Failed`, or
//!   `DeadLettered`.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use requeue::{Backoff, InstantSleeper, PublishRequest, RetryExecutor};
//! use requeue::Delivery;
//!
//! #[derive(Debug)]
//! struct SendFailed;
//! impl std::fmt::Display for SendFailed {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "send failed") }
//! }
//! impl std::error::Error for SendFailed {}
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let executor = RetryExecutor::<String, SendFailed>::builder()
//!     .max_attempts(3)
//!     .backoff(Backoff::constant(Duration::from_millis(50)))
//!     .with_sleeper(InstantSleeper)
//!     .build()
//!     .unwrap();
//!
//! let request = PublishRequest::new("orders", None, "payload".to_string());
//! let outcome = executor
//!     .execute(request, || async { Ok::<_, SendFailed>(Delivery::new("orders")) })
//!     .await;
//! assert!(outcome.is_success());
//! # });
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::oneshot;
use tower_layer::Layer;
use tower_service::Service;

use crate::backoff::Backoff;
use crate::error::ExhaustedPublish;
use crate::handler::{Disposition, ExhaustedHandler};
use crate::outcome::{Delivery, PublishHandle, PublishOutcome, PublishRequest};
use crate::scheduler::RetryScheduler;
use crate::sleeper::{Sleeper, TokioSleeper};
use crate::telemetry::sinks::{boxed, emit_best_effort, BoxedSink, NullSink};
use crate::telemetry::{PublishEvent, TelemetrySink};

/// Drives the attempt loop for publish sequences.
///
/// Immutable after construction; one executor is shared across any number of
/// concurrent sequences, each of which owns its own attempt counter and
/// correlation id.
pub struct RetryExecutor<P, E> {
    max_attempts: usize,
    backoff: Backoff,
    sleeper: Arc<dyn Sleeper>,
    handlers: Arc<[Arc<dyn ExhaustedHandler<P, E>>]>,
    telemetry: BoxedSink,
}

impl<P, E> Clone for RetryExecutor<P, E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            backoff: self.backoff.clone(),
            sleeper: Arc::clone(&self.sleeper),
            handlers: Arc::clone(&self.handlers),
            telemetry: self.telemetry.clone(),
        }
    }
}

impl<P, E> fmt::Debug for RetryExecutor<P, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .field("handlers", &self.handlers.len())
            .field("sleeper", &"<sleeper>")
            .finish()
    }
}

/// Errors produced while building a retry executor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// `max_attempts` must be > 0.
    #[error("max_attempts must be > 0 (got {0})")]
    InvalidMaxAttempts(usize),
}

impl<P, E> RetryExecutor<P, E>
where
    P: Send + Sync + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    /// Construct a new builder with defaults.
    pub fn builder() -> RetryExecutorBuilder<P, E> {
        RetryExecutorBuilder::new()
    }

    /// Total attempts this executor makes before declaring exhaustion.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Drive one sequence to its terminal outcome on the current task.
    ///
    /// `work` is invoked once per attempt and must start a fresh publish each
    /// time. The request's topic/key/payload/correlation id ride along for
    /// logging and the exhaustion record; `work` owns its own copies.
    pub async fn execute<W, Fut>(
        &self,
        request: PublishRequest<P>,
        mut work: W,
    ) -> PublishOutcome<P, E>
    where
        W: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<Delivery, E>> + Send,
    {
        for attempt in 1..=self.max_attempts {
            match work().await {
                Ok(delivery) => {
                    tracing::info!(
                        topic = %request.topic,
                        key = ?request.key,
                        attempt,
                        correlation_id = %request.correlation_id,
                        partition = ?delivery.partition,
                        offset = ?delivery.offset,
                        "publish succeeded"
                    );
                    self.emit(PublishEvent::PublishSucceeded {
                        topic: request.topic.clone(),
                        attempt,
                    })
                    .await;
                    return PublishOutcome::Success {
                        delivery,
                        correlation_id: request.correlation_id,
                    };
                }
                Err(cause) => {
                    tracing::warn!(
                        topic = %request.topic,
                        key = ?request.key,
                        attempt,
                        correlation_id = %request.correlation_id,
                        error = %cause,
                        "publish attempt failed"
                    );

                    if attempt < self.max_attempts {
                        let delay = self.backoff.delay_for(attempt);
                        tracing::debug!(
                            topic = %request.topic,
                            key = ?request.key,
                            next_attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            correlation_id = %request.correlation_id,
                            "scheduling retry"
                        );
                        self.emit(PublishEvent::RetryScheduled {
                            topic: request.topic.clone(),
                            attempt: attempt + 1,
                            delay,
                        })
                        .await;
                        self.sleeper.sleep(delay).await;
                    } else {
                        return self.exhaust(request, cause).await;
                    }
                }
            }
        }

        // Loop always returns: success settles, non-final failures continue,
        // and the final failure takes the exhaustion branch.
        debug_assert!(false, "retry loop should have returned; this indicates a logic bug");
        unreachable!()
    }

    /// Spawn the sequence onto the scheduler pool and return immediately.
    ///
    /// The handle settles exactly once with the sequence outcome. If the
    /// driving task dies before settling, the handle resolves with
    /// `SequenceAborted` instead of hanging.
    pub fn dispatch<W, Fut>(
        &self,
        scheduler: &RetryScheduler,
        request: PublishRequest<P>,
        work: W,
    ) -> PublishHandle<P, E>
    where
        W: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Delivery, E>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let correlation_id = request.correlation_id.clone();
        let executor = self.clone();
        scheduler.spawn(async move {
            let outcome = executor.execute(request, work).await;
            // Receiver may have been dropped; the sequence still ran to its
            // terminal state, so there is nothing further to settle.
            let _ = tx.send(outcome);
        });
        PublishHandle::new(rx, correlation_id)
    }

    async fn exhaust(&self, request: PublishRequest<P>, cause: E) -> PublishOutcome<P, E> {
        tracing::error!(
            topic = %request.topic,
            key = ?request.key,
            attempts = self.max_attempts,
            correlation_id = %request.correlation_id,
            error = %cause,
            "publish retries exhausted"
        );
        self.emit(PublishEvent::RetriesExhausted {
            topic: request.topic.clone(),
            attempts: self.max_attempts,
        })
        .await;

        let failure = Arc::new(ExhaustedPublish::new(request, cause));
        let mut routed: Option<String> = None;
        for handler in self.handlers.iter() {
            match handler.on_exhausted(&failure).await {
                Ok(Disposition::DeadLettered { topic }) => {
                    routed.get_or_insert(topic);
                }
                Ok(Disposition::Observed) => {}
                Err(error) => {
                    tracing::error!(
                        topic = %failure.topic(),
                        correlation_id = %failure.correlation_id(),
                        error = %error,
                        "exhaustion handler failed"
                    );
                }
            }
        }

        match routed {
            Some(topic) => PublishOutcome::DeadLettered { topic, failure },
            None => PublishOutcome::Failed { failure },
        }
    }

    async fn emit(&self, event: PublishEvent) {
        emit_best_effort(self.telemetry.clone(), event).await;
    }
}

/// Builder for [`RetryExecutor`].
pub struct RetryExecutorBuilder<P, E> {
    max_attempts: usize,
    backoff: Backoff,
    sleeper: Arc<dyn Sleeper>,
    handlers: Vec<Arc<dyn ExhaustedHandler<P, E>>>,
    telemetry: BoxedSink,
}

impl<P, E> RetryExecutorBuilder<P, E>
where
    P: Send + Sync + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    /// Create a builder with the conventional producer defaults.
    pub fn new() -> Self {
        Self {
            max_attempts: 5,
            backoff: Backoff::new(
                std::time::Duration::from_millis(100),
                2.0,
                std::time::Duration::from_millis(5000),
            ),
            sleeper: Arc::new(TokioSleeper),
            handlers: Vec::new(),
            telemetry: boxed(NullSink),
        }
    }

    /// Set total attempts (initial + retries). Must be > 0.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the backoff schedule.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Provide a custom sleeper implementation.
    pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Append an exhaustion handler. Handlers run in registration order.
    pub fn handler(mut self, handler: Arc<dyn ExhaustedHandler<P, E>>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Send executor events to the given telemetry sink.
    pub fn telemetry<S>(mut self, sink: S) -> Self
    where
        S: TelemetrySink,
        <S as Service<PublishEvent>>::Future: Send + 'static,
    {
        self.telemetry = boxed(sink);
        self
    }

    /// Build the executor, validating inputs.
    pub fn build(self) -> Result<RetryExecutor<P, E>, BuildError> {
        if self.max_attempts == 0 {
            return Err(BuildError::InvalidMaxAttempts(0));
        }
        Ok(RetryExecutor {
            max_attempts: self.max_attempts,
            backoff: self.backoff,
            sleeper: self.sleeper,
            handlers: self.handlers.into(),
            telemetry: self.telemetry,
        })
    }
}

impl<P, E> Default for RetryExecutorBuilder<P, E>
where
    P: Send + Sync + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Tower layer that wraps a publish service in the retry executor.
pub struct RetryLayer<P, E> {
    executor: RetryExecutor<P, E>,
}

impl<P, E> RetryLayer<P, E> {
    pub fn new(executor: RetryExecutor<P, E>) -> Self {
        Self { executor }
    }
}

impl<P, E> Clone for RetryLayer<P, E> {
    fn clone(&self) -> Self {
        Self { executor: self.executor.clone() }
    }
}

impl<S, P, E> Layer<S> for RetryLayer<P, E> {
    type Service = RetryService<S, P, E>;

    fn layer(&self, inner: S) -> Self::Service {
        RetryService { inner, executor: self.executor.clone() }
    }
}

/// Retry service produced by [`RetryLayer`].
///
/// Wraps any `Service<PublishRequest<P>, Response = Delivery>` (the publish
/// collaborator) so every call runs through the full attempt loop, exhaustion
/// fan-out included. The response is the sequence outcome; the service error
/// channel only carries readiness failures from the inner service.
pub struct RetryService<S, P, E> {
    inner: S,
    executor: RetryExecutor<P, E>,
}

impl<S, P, E> Clone for RetryService<S, P, E>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone(), executor: self.executor.clone() }
    }
}

impl<S, P, E> Service<PublishRequest<P>> for RetryService<S, P, E>
where
    S: Service<PublishRequest<P>, Response = Delivery> + Clone + Send + 'static,
    S::Error: Into<E>,
    S::Future: Send + 'static,
    P: Clone + Send + Sync + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    type Response = PublishOutcome<P, E>;
    type Error = E;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, request: PublishRequest<P>) -> Self::Future {
        let executor = self.executor.clone();
        let mut inner = self.inner.clone();
        let attempt_request = request.clone();
        Box::pin(async move {
            let outcome = executor
                .execute(request, move || {
                    use futures::TryFutureExt;
                    inner.call(attempt_request.clone()).map_err(Into::into)
                })
                .await;
            Ok(outcome)
        })
    }
}
