use std::fmt;
use std::time::Duration;

use serde_json::json;

/// Events emitted by the retry executor while driving a publish sequence.
///
/// Three counters, each taggable by topic: retries scheduled, publishes that
/// eventually succeeded, and sequences that exhausted their budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishEvent {
    /// A re-attempt was scheduled after a failed attempt.
    RetryScheduled {
        topic: String,
        /// The upcoming attempt number (1-indexed).
        attempt: usize,
        /// Backoff delay before that attempt runs.
        delay: Duration,
    },
    /// An attempt succeeded and settled the sequence.
    PublishSucceeded {
        topic: String,
        /// The attempt that succeeded (1-indexed).
        attempt: usize,
    },
    /// The attempt budget was consumed without success.
    RetriesExhausted {
        topic: String,
        /// Total attempts made, including the first.
        attempts: usize,
    },
}

impl PublishEvent {
    /// Topic tag shared by every event variant.
    pub fn topic(&self) -> &str {
        match self {
            Self::RetryScheduled { topic, .. }
            | Self::PublishSucceeded { topic, .. }
            | Self::RetriesExhausted { topic, .. } => topic,
        }
    }

    /// Stable machine-readable label for counter names.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RetryScheduled { .. } => "retry_scheduled",
            Self::PublishSucceeded { .. } => "publish_succeeded",
            Self::RetriesExhausted { .. } => "retries_exhausted",
        }
    }
}

impl fmt::Display for PublishEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RetryScheduled { topic, attempt, delay } => {
                write!(f, "RetryScheduled(topic={topic}, #{attempt}, delay={delay:?})")
            }
            Self::PublishSucceeded { topic, attempt } => {
                write!(f, "PublishSucceeded(topic={topic}, #{attempt})")
            }
            Self::RetriesExhausted { topic, attempts } => {
                write!(f, "RetriesExhausted(topic={topic}, attempts={attempts})")
            }
        }
    }
}

#[inline]
fn clamp_u64(val: u128) -> u64 {
    val.min(u128::from(u64::MAX)) as u64
}

/// Convert a `PublishEvent` into a JSON value for structured sinks.
pub fn event_to_json(event: &PublishEvent) -> serde_json::Value {
    match event {
        PublishEvent::RetryScheduled { topic, attempt, delay } => json!({
            "kind": "retry_scheduled",
            "topic": topic,
            "attempt": *attempt,
            "delay_ms": clamp_u64(delay.as_millis()),
        }),
        PublishEvent::PublishSucceeded { topic, attempt } => json!({
            "kind": "publish_succeeded",
            "topic": topic,
            "attempt": *attempt,
        }),
        PublishEvent::RetriesExhausted { topic, attempts } => json!({
            "kind": "retries_exhausted",
            "topic": topic,
            "attempts": *attempts,
        }),
    }
}
