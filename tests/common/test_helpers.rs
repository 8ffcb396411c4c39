use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use requeue::{Delivery, Disposition, ExhaustedHandler, ExhaustedPublish, HandlerError, Publisher};

/// Broker error used by every scripted publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestPublishError(pub String);

impl fmt::Display for TestPublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "publish failed: {}", self.0)
    }
}

impl std::error::Error for TestPublishError {}

/// In-memory publisher that fails the first `failures` calls, then succeeds
/// and records what it published.
#[derive(Debug, Default)]
pub struct ScriptedPublisher {
    pub failures: usize,
    pub calls: AtomicUsize,
    pub published: Mutex<Vec<(String, Option<String>, String)>>,
}

impl ScriptedPublisher {
    pub fn failing_first(failures: usize) -> Self {
        Self { failures, ..Default::default() }
    }

    pub fn always_failing() -> Self {
        Self::failing_first(usize::MAX)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn published(&self) -> Vec<(String, Option<String>, String)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher<String> for ScriptedPublisher {
    type Error = TestPublishError;

    async fn publish(
        &self,
        topic: &str,
        key: Option<&str>,
        payload: &String,
    ) -> Result<Delivery, Self::Error> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(TestPublishError(format!("attempt {}", call + 1)));
        }
        self.published.lock().unwrap().push((
            topic.to_string(),
            key.map(str::to_string),
            payload.clone(),
        ));
        Ok(Delivery::new(topic).with_partition(0).with_offset(call as i64))
    }
}

/// Handler that records every fan-out it receives.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    pub invocations: AtomicUsize,
    pub seen: Mutex<Vec<(String, String)>>,
}

impl RecordingHandler {
    pub fn invocation_count(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// (topic, correlation id) pairs, in fan-out order.
    pub fn seen(&self) -> Vec<(String, String)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExhaustedHandler<String, TestPublishError> for RecordingHandler {
    async fn on_exhausted(
        &self,
        failure: &ExhaustedPublish<String, TestPublishError>,
    ) -> Result<Disposition, HandlerError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push((
            failure.topic().to_string(),
            failure.correlation_id().as_str().to_string(),
        ));
        Ok(Disposition::Observed)
    }
}

/// Handler that always errors, for containment tests.
#[derive(Debug, Default)]
pub struct FailingHandler {
    pub invocations: AtomicUsize,
}

#[async_trait]
impl ExhaustedHandler<String, TestPublishError> for FailingHandler {
    async fn on_exhausted(
        &self,
        _failure: &ExhaustedPublish<String, TestPublishError>,
    ) -> Result<Disposition, HandlerError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Err("handler blew up".into())
    }
}
