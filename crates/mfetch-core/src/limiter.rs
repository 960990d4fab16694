//! Counting limiter on the number of items downloading at once.
//!
//! Backed by a tokio semaphore, whose waiters are served in FIFO order, so a
//! waiting fetch always gets a slot once enough earlier holders release.

use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Shared limiter. Cloning shares the same slots.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    capacity: usize,
    sem: Arc<Semaphore>,
}

/// One held slot; dropping it releases the slot.
#[derive(Debug)]
pub struct LimiterPermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    /// Create a limiter with `capacity` slots (at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            sem: Arc::new(Semaphore::new(capacity)),
        }
    }

    /// Waits until a slot is free and takes it.
    /// Fails only if the semaphore was closed, which the limiter never does.
    pub async fn acquire(&self) -> Result<LimiterPermit, AcquireError> {
        let permit = Arc::clone(&self.sem).acquire_owned().await?;
        Ok(LimiterPermit { _permit: permit })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently held.
    pub fn in_use(&self) -> usize {
        self.capacity - self.sem.available_permits()
    }
}
