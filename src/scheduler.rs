//! Worker pool that drives retry sequences off the caller's task.
//!
//! A sequence dispatched through a `RetryScheduler` runs entirely on pool
//! threads: the submitting call returns immediately and the submitting task
//! does not need to stay alive for scheduled re-attempts to fire.
//!
//! Two flavors:
//! - [`RetryScheduler::current`] borrows the ambient tokio runtime.
//! - [`RetryScheduler::background`] owns a dedicated multi-thread runtime
//!   sized by `scheduler_threads` from the configuration surface. On drop the
//!   owned runtime is shut down with `shutdown_background`, so outstanding
//!   scheduled tasks are abandoned rather than awaited at process teardown.

use std::future::Future;
use std::io;
use std::sync::Arc;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

/// Execution pool for dispatched publish sequences.
#[derive(Debug, Clone)]
pub struct RetryScheduler {
    handle: Handle,
    _owned: Option<Arc<OwnedRuntime>>,
}

#[derive(Debug)]
struct OwnedRuntime(Option<Runtime>);

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

impl RetryScheduler {
    /// Schedule onto the runtime of the calling context.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime, like `Handle::current`.
    pub fn current() -> Self {
        Self { handle: Handle::current(), _owned: None }
    }

    /// Build a dedicated pool with the given number of worker threads
    /// (clamped to at least one). Threads are named `requeue-retry`.
    pub fn background(threads: usize) -> io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(threads.max(1))
            .thread_name("requeue-retry")
            .enable_time()
            .build()?;
        let handle = runtime.handle().clone();
        Ok(Self { handle, _owned: Some(Arc::new(OwnedRuntime(Some(runtime)))) })
    }

    /// Submit a sequence to the pool. Non-blocking.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }
}
