//! Minimal end-to-end run: a flaky in-memory broker, retry with exponential
//! backoff, dead-letter routing, and log output for every transition.
//!
//! ```sh
//! cargo run --example retry_publish
//! ```

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use requeue::telemetry::LogSink;
use requeue::{
    DeadLetterHandler, Delivery, LoggingHandler, Publisher, RetryConfig, RetryExecutor,
    RetryScheduler, RetryingProducer,
};

#[derive(Debug)]
struct BrokerUnavailable;

impl fmt::Display for BrokerUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "broker unavailable")
    }
}

impl std::error::Error for BrokerUnavailable {}

/// Fails the first two publishes to any topic, then recovers.
#[derive(Debug, Default)]
struct FlakyBroker {
    calls: AtomicUsize,
}

#[async_trait]
impl Publisher<String> for FlakyBroker {
    type Error = BrokerUnavailable;

    async fn publish(
        &self,
        topic: &str,
        _key: Option<&str>,
        _payload: &String,
    ) -> Result<Delivery, Self::Error> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < 2 {
            return Err(BrokerUnavailable);
        }
        Ok(Delivery::new(topic).with_partition(0).with_offset(call as i64))
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let config = RetryConfig::default();
    let broker = Arc::new(FlakyBroker::default());

    let executor = RetryExecutor::<String, BrokerUnavailable>::builder()
        .max_attempts(config.max_attempts)
        .backoff(config.backoff())
        .handler(Arc::new(LoggingHandler))
        .handler(Arc::new(DeadLetterHandler::new(Arc::clone(&broker), config.routing())))
        .telemetry(LogSink)
        .build()
        .expect("valid retry configuration");

    let producer =
        RetryingProducer::new(broker, Arc::new(executor), RetryScheduler::current());

    let handle = producer
        .send("orders", Some("order-1".to_string()), r#"{"id":1}"#.to_string())
        .expect("valid request");

    match handle.await {
        Ok(outcome) => {
            tracing::info!(
                correlation_id = %outcome.correlation_id(),
                delivery = ?outcome.delivery(),
                dead_letter_topic = ?outcome.dead_letter_topic(),
                "sequence settled"
            );
        }
        Err(aborted) => tracing::error!(error = %aborted, "sequence aborted"),
    }
}
