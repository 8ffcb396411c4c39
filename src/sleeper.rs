//! Delay abstraction used between publish attempts.
//!
//! The executor never calls `tokio::time::sleep` directly; it awaits through
//! a `Sleeper` so tests can run deep retry chains without real time passing
//! (`InstantSleeper`) or assert the exact delay sequence (`TrackingSleeper`).

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Applies the delay between a failed attempt and the next one.
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    /// Resolve at or after `duration` has elapsed.
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

/// Production sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Test sleeper that resolves immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantSleeper;

impl Sleeper for InstantSleeper {
    fn sleep(&self, _duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async {})
    }
}

/// Test sleeper that records every requested delay and resolves immediately.
#[derive(Debug, Clone, Default)]
pub struct TrackingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl TrackingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sleeps requested so far.
    pub fn calls(&self) -> usize {
        self.delays.lock().unwrap().len()
    }

    /// All requested delays, in order.
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }

    /// The delay of the idx-th sleep, if it happened.
    pub fn call_at(&self, idx: usize) -> Option<Duration> {
        self.delays.lock().unwrap().get(idx).copied()
    }

    pub fn clear(&self) {
        self.delays.lock().unwrap().clear();
    }
}

impl Sleeper for TrackingSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        self.delays.lock().unwrap().push(duration);
        Box::pin(async {})
    }
}
