//! Bounded task execution.
//!
//! The limiter is the only backpressure between the candidate list and the
//! provider sites. Tasks are admitted in submission order (tokio's semaphore
//! is FIFO) and each admitted task runs on its own tokio task, so a panic in
//! one probe cannot take down the others.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Why a scheduled task produced no value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskFailure {
    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("task was cancelled before it ran")]
    Cancelled,
}

/// Handle to an admitted task.
pub struct TaskHandle<T> {
    inner: JoinHandle<T>,
}

impl<T> TaskHandle<T> {
    /// Waits for the task and converts a panic into [`TaskFailure`].
    pub async fn join(self) -> Result<T, TaskFailure> {
        match self.inner.await {
            Ok(value) => Ok(value),
            Err(e) if e.is_panic() => Err(TaskFailure::Panicked(panic_message(e.into_panic()))),
            Err(_) => Err(TaskFailure::Cancelled),
        }
    }
}

/// Runs futures with at most `capacity` of them in flight.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    cancel: CancellationToken,
}

impl ConcurrencyLimiter {
    /// Capacity used when nothing else is requested.
    pub const DEFAULT_CAPACITY: usize = 10;

    /// Creates a limiter with a fixed capacity (at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            cancel: CancellationToken::new(),
        }
    }

    /// Stops admitting tasks once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Waits for a free slot, then spawns `task` holding it.
    ///
    /// Callers awaiting `admit` are served in the order they started waiting.
    ///
    /// # Errors
    ///
    /// Returns [`TaskFailure::Cancelled`] if the limiter is cancelled before
    /// a slot frees up. The task is then dropped without running.
    pub async fn admit<F, T>(&self, task: F) -> Result<TaskHandle<T>, TaskFailure>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self.acquire().await?;

        let inner = tokio::spawn(async move {
            let _permit = permit;
            task.await
        });

        Ok(TaskHandle { inner })
    }

    /// Runs a single task under the limit and waits for its result.
    ///
    /// # Errors
    ///
    /// Returns [`TaskFailure`] if the task panicked or was never admitted.
    pub async fn schedule<F, T>(&self, task: F) -> Result<T, TaskFailure>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.admit(task).await?.join().await
    }

    /// Runs every task under the limit.
    ///
    /// Results are returned in submission order. Once the limiter is
    /// cancelled, tasks not yet admitted resolve to
    /// [`TaskFailure::Cancelled`] while admitted ones run to completion.
    pub async fn run_all<I, F, T>(&self, tasks: I) -> Vec<Result<T, TaskFailure>>
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let mut handles = Vec::new();

        for task in tasks {
            handles.push(self.admit(task).await);
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(match handle {
                Ok(handle) => handle.join().await,
                Err(failure) => Err(failure),
            });
        }

        results
    }

    async fn acquire(&self) -> Result<OwnedSemaphorePermit, TaskFailure> {
        if self.cancel.is_cancelled() {
            return Err(TaskFailure::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(TaskFailure::Cancelled),
            permit = self.semaphore.clone().acquire_owned() => {
                permit.map_err(|_| TaskFailure::Cancelled)
            }
        }
    }
}

impl Default for ConcurrencyLimiter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
