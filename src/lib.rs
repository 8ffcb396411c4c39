#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # requeue
//!
//! Retry, backoff, and dead-letter orchestration for async message
//! publishing.
//!
//! ## Features
//!
//! - **Retry executor** driving a bounded, strictly serialized attempt loop
//!   per publish sequence
//! - **Exponential backoff** with a configurable multiplier and hard cap
//! - **Exhaustion fan-out** to an ordered set of handlers (structured
//!   logging, dead-letter publish)
//! - **Dead-letter routing** by override topic or `.dlq` suffixing
//! - **Exactly-once settlement** of each sequence's outcome, even when
//!   dispatched onto a background scheduler pool
//! - **Telemetry sinks** counting scheduled retries, successes, and
//!   exhaustions per topic
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use requeue::{
//!     DeadLetterHandler, LoggingHandler, RetryConfig, RetryExecutor,
//!     RetryScheduler, RetryingProducer,
//! };
//! # use requeue::{Delivery, Publisher};
//! # use async_trait::async_trait;
//! # #[derive(Debug)] struct Broker;
//! # #[derive(Debug)] struct BrokerError;
//! # impl std::fmt::Display for BrokerError {
//! #     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "broker error") }
//! # }
//! # impl std::error::Error for BrokerError {}
//! # #[async_trait]
//! # impl Publisher<String> for Broker {
//! #     type Error = BrokerError;
//! #     async fn publish(&self, topic: &str, _key: Option<&str>, _payload: &String)
//! #         -> Result<Delivery, Self::Error> { Ok(Delivery::new(topic)) }
//! # }
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = RetryConfig::default();
//!     let broker = Arc::new(Broker);
//!
//!     let executor = RetryExecutor::<String, BrokerError>::builder()
//!         .max_attempts(config.max_attempts)
//!         .backoff(config.backoff())
//!         .handler(Arc::new(LoggingHandler))
//!         .handler(Arc::new(DeadLetterHandler::new(Arc::clone(&broker), config.routing())))
//!         .build()
//!         .expect("valid retry configuration");
//!
//!     let producer = RetryingProducer::new(
//!         broker,
//!         Arc::new(executor),
//!         RetryScheduler::current(),
//!     );
//!
//!     let handle = producer
//!         .send("orders", Some("order-1".into()), "payload".to_string())
//!         .expect("valid request");
//!     let outcome = handle.await.expect("sequence settled");
//!     println!("published: {:?}", outcome.delivery());
//! }
//! ```

pub mod backoff;
pub mod config;
pub mod correlation;
pub mod error;
pub mod handler;
pub mod outcome;
pub mod producer;
pub mod retry;
pub mod routing;
pub mod scheduler;
pub mod sleeper;
pub mod telemetry;

// Re-exports
pub use backoff::Backoff;
pub use config::RetryConfig;
pub use correlation::CorrelationId;
pub use error::{ExhaustedPublish, InvalidRequest, SequenceAborted};
pub use handler::{
    DeadLetterHandler, Disposition, ExhaustedHandler, HandlerError, LoggingHandler,
};
pub use outcome::{Delivery, PublishHandle, PublishOutcome, PublishRequest};
pub use producer::{Publisher, RetryingProducer};
pub use retry::{BuildError, RetryExecutor, RetryExecutorBuilder, RetryLayer, RetryService};
pub use routing::{DlqRouting, DLQ_SUFFIX};
pub use scheduler::RetryScheduler;
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
