//! Configuration surface for retry and dead-letter behavior.
//!
//! Values are deserialized from whatever config source the application binds
//! (a file, environment layer, etc. — binding itself lives outside this
//! crate). Defaults match the conventional producer settings:
//!
//! ```json
//! {
//!   "max_attempts": 5,
//!   "initial_backoff_ms": 100,
//!   "multiplier": 2.0,
//!   "max_backoff_ms": 5000,
//!   "dlq_append_suffix": true,
//!   "dlq_topic": null,
//!   "scheduler_threads": 2
//! }
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::backoff::Backoff;
use crate::routing::DlqRouting;

/// Retry, backoff, and dead-letter settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: usize,
    /// Delay before the first retry, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Growth factor applied per attempt. `2.0` doubles the delay each time.
    pub multiplier: f64,
    /// Cap on any computed delay, in milliseconds.
    pub max_backoff_ms: u64,
    /// Append `.dlq` to the original topic when no override is set.
    pub dlq_append_suffix: bool,
    /// Explicit dead-letter topic; takes precedence over suffixing.
    pub dlq_topic: Option<String>,
    /// Worker threads for the background retry scheduler.
    pub scheduler_threads: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 100,
            multiplier: 2.0,
            max_backoff_ms: 5000,
            dlq_append_suffix: true,
            dlq_topic: None,
            scheduler_threads: 2,
        }
    }
}

impl RetryConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    /// Backoff schedule described by this configuration.
    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.initial_backoff(), self.multiplier, self.max_backoff())
    }

    /// Dead-letter routing policy described by this configuration.
    pub fn routing(&self) -> DlqRouting {
        DlqRouting::new(self.dlq_topic.clone(), self.dlq_append_suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.initial_backoff(), Duration::from_millis(100));
        assert_eq!(config.multiplier, 2.0);
        assert_eq!(config.max_backoff(), Duration::from_millis(5000));
        assert!(config.dlq_append_suffix);
        assert_eq!(config.dlq_topic, None);
        assert_eq!(config.scheduler_threads, 2);
    }

    #[test]
    fn partial_deserialization_fills_defaults() {
        let config: RetryConfig =
            serde_json::from_str(r#"{"max_attempts": 3, "dlq_topic": "global.dlq"}"#).unwrap();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.dlq_topic.as_deref(), Some("global.dlq"));
        assert_eq!(config.initial_backoff_ms, 100);
        assert!(config.dlq_append_suffix);
    }

    #[test]
    fn backoff_helper_reflects_config_values() {
        let config: RetryConfig = serde_json::from_str(
            r#"{"initial_backoff_ms": 50, "multiplier": 3.0, "max_backoff_ms": 400}"#,
        )
        .unwrap();
        let backoff = config.backoff();
        assert_eq!(backoff.delay_for(1), Duration::from_millis(50));
        assert_eq!(backoff.delay_for(2), Duration::from_millis(150));
        assert_eq!(backoff.delay_for(3), Duration::from_millis(400)); // capped
    }

    #[test]
    fn routing_helper_honors_override_precedence() {
        let config: RetryConfig = serde_json::from_str(r#"{"dlq_topic": "global.dlq"}"#).unwrap();
        assert_eq!(config.routing().resolve("orders"), "global.dlq");

        let config = RetryConfig::default();
        assert_eq!(config.routing().resolve("orders"), "orders.dlq");

        let config: RetryConfig =
            serde_json::from_str(r#"{"dlq_append_suffix": false}"#).unwrap();
        assert_eq!(config.routing().resolve("orders"), "orders");
    }
}
