//! Metrics and event side channel for publish sequences.
//!
//! The executor emits a [`PublishEvent`] at each state transition worth
//! counting: a retry being scheduled, a publish settling successfully, and a
//! sequence exhausting its budget. Events flow through [`TelemetrySink`]
//! implementations which can log, aggregate, or forward them; delivery is
//! best-effort and never affects the sequence outcome.
//!
//! The `requeue-prometheus` companion crate exports these events as
//! Prometheus counters labeled by event kind and topic.

pub mod events;
pub mod sinks;

pub use events::{event_to_json, PublishEvent};
pub use sinks::{
    boxed, emit_best_effort, BoxedSink, LogSink, MemorySink, NullSink, TelemetrySink,
};
