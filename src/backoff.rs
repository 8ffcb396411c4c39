//! Exponential backoff schedule for publish retries.
//!
//! Attempt semantics are 1-based: `delay_for(1)` is the delay inserted after
//! the first failed attempt and always equals the initial backoff. The delay
//! for attempt `n` is `initial * multiplier^(n - 1)`, clamped to the
//! configured cap. The schedule is pure and deterministic; no jitter is
//! applied, so two executors with the same configuration produce identical
//! delay sequences.
//!
//! A `multiplier` below `1.0` is legal and yields decaying delays. Values
//! that overflow or are not representable clamp to the cap.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use requeue::Backoff;
//!
//! let backoff = Backoff::new(
//!     Duration::from_millis(100),
//!     2.0,
//!     Duration::from_millis(5000),
//! );
//! assert_eq!(backoff.delay_for(1), Duration::from_millis(100));
//! assert_eq!(backoff.delay_for(2), Duration::from_millis(200));
//! assert_eq!(backoff.delay_for(7), Duration::from_millis(5000)); // capped
//! ```

use std::time::Duration;

/// Exponential backoff schedule with a hard cap.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    initial: Duration,
    multiplier: f64,
    max: Duration,
}

impl Backoff {
    /// Create a schedule from an initial delay, growth multiplier, and cap.
    pub fn new(initial: Duration, multiplier: f64, max: Duration) -> Self {
        Self { initial, multiplier, max }
    }

    /// Constant schedule: every retry waits the same delay.
    pub fn constant(delay: Duration) -> Self {
        Self { initial: delay, multiplier: 1.0, max: delay }
    }

    /// The delay before the first retry.
    pub fn initial(&self) -> Duration {
        self.initial
    }

    /// The cap applied to every computed delay.
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Delay after the given failed attempt (1-based).
    ///
    /// `attempt <= 1` returns the initial delay (exponent treated as zero).
    /// Results never exceed the cap and are never negative; non-finite
    /// intermediate products clamp to the cap.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as usize) as i32;
        let factor = self.multiplier.powi(exponent);
        if !factor.is_finite() {
            return self.max;
        }

        let nanos = self.initial.as_nanos() as f64 * factor;
        if !nanos.is_finite() {
            return self.max;
        }
        if nanos <= 0.0 {
            return Duration::ZERO;
        }

        let max_nanos = self.max.as_nanos().min(u64::MAX as u128) as u64;
        if nanos >= max_nanos as f64 {
            return self.max;
        }
        Duration::from_nanos(nanos as u64)
    }
}
