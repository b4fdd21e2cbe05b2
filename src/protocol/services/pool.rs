//! Bounded worker pool for background generation.
//!
//! Admission is two-staged: a slot counter caps how many jobs may be
//! accepted and unfinished at once, and a semaphore caps how many of those
//! render at the same time. A full pool rejects new work immediately
//! instead of queueing it without bound.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};

/// The pool has no free slot.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("generation pool is full: {in_flight} of {capacity} jobs in flight")]
pub struct PoolFull {
    /// Jobs accepted and not yet finished.
    pub in_flight: usize,
    /// Maximum accepted, unfinished jobs.
    pub capacity: usize,
}

/// Point-in-time pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Jobs accepted and not yet finished, running or waiting.
    pub in_flight: usize,
    /// Jobs currently holding a render permit.
    pub running: usize,
    /// Maximum accepted, unfinished jobs.
    pub capacity: usize,
    /// Maximum jobs rendering at once.
    pub max_concurrent: usize,
}

#[derive(Debug)]
struct PoolInner {
    permits: Arc<Semaphore>,
    in_flight: AtomicUsize,
    capacity: usize,
    max_concurrent: usize,
}

/// Bounded pool that runs generation jobs on the tokio runtime.
#[derive(Debug, Clone)]
pub struct GenerationPool {
    inner: Arc<PoolInner>,
}

/// A reserved place in the pool, released when dropped.
#[derive(Debug)]
pub struct PoolSlot {
    inner: Arc<PoolInner>,
}

impl Drop for PoolSlot {
    fn drop(&mut self) {
        self.inner.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Awaitable handle to a spawned job.
#[derive(Debug)]
pub struct JobHandle<T> {
    task: JoinHandle<T>,
}

impl<T> JobHandle<T> {
    /// Waits for the job to finish.
    ///
    /// # Errors
    ///
    /// Returns the [`JoinError`] if the job panicked or was aborted.
    pub async fn wait(self) -> Result<T, JoinError> {
        self.task.await
    }

    /// Returns `true` once the job has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl GenerationPool {
    /// Creates a pool; both limits are raised to at least one.
    #[must_use]
    pub fn new(max_concurrent: usize, capacity: usize) -> Self {
        let workers = max_concurrent.max(1);
        Self {
            inner: Arc::new(PoolInner {
                permits: Arc::new(Semaphore::new(workers)),
                in_flight: AtomicUsize::new(0),
                capacity: capacity.max(1),
                max_concurrent: workers,
            }),
        }
    }

    /// Reserves a slot for one job.
    ///
    /// # Errors
    ///
    /// Returns [`PoolFull`] when `capacity` jobs are already in flight.
    pub fn try_reserve(&self) -> Result<PoolSlot, PoolFull> {
        let capacity = self.inner.capacity;
        self.inner
            .in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < capacity).then_some(current + 1)
            })
            .map(|_| PoolSlot {
                inner: Arc::clone(&self.inner),
            })
            .map_err(|in_flight| PoolFull {
                in_flight,
                capacity,
            })
    }

    /// Spawns `work`; it starts once a render permit is free and releases
    /// `slot` when it finishes.
    pub fn spawn<F>(&self, slot: PoolSlot, work: F) -> JobHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let permits = Arc::clone(&self.inner.permits);
        let task = tokio::spawn(async move {
            let _slot = slot;
            // The semaphore is never closed, so acquisition only waits.
            let _permit = permits.acquire_owned().await.ok();
            work.await
        });
        JobHandle { task }
    }

    /// Returns current occupancy.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let available = self.inner.permits.available_permits();
        PoolStats {
            in_flight: self.inner.in_flight.load(Ordering::Acquire),
            running: self.inner.max_concurrent.saturating_sub(available),
            capacity: self.inner.capacity,
            max_concurrent: self.inner.max_concurrent,
        }
    }
}
