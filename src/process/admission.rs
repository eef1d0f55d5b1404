/*!
 * Admission Controller
 *
 * Gates new runs against the concurrency ceiling with a counting semaphore.
 * Waiters are woken as permits are released, not by polling. Tokio's
 * semaphore queues waiters FIFO, so admission follows arrival order in
 * practice, but callers should not depend on it.
 */

use crate::core::errors::{PoolError, PoolResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

pub(crate) struct AdmissionController {
    semaphore: Arc<Semaphore>,
    shutting_down: AtomicBool,
    max_concurrent: usize,
}

impl AdmissionController {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            shutting_down: AtomicBool::new(false),
            max_concurrent,
        }
    }

    /// Wait for a free slot
    ///
    /// Fails with [`PoolError::ShuttingDown`] if the pool is closed before or
    /// while waiting.
    pub async fn acquire(&self) -> PoolResult<OwnedSemaphorePermit> {
        self.ensure_open()?;

        if self.semaphore.available_permits() == 0 {
            debug!(max_concurrent = self.max_concurrent, "Pool saturated; waiting for a slot");
        }

        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::ShuttingDown)?;

        self.ensure_open()?;
        Ok(permit)
    }

    #[inline]
    pub fn ensure_open(&self) -> PoolResult<()> {
        if self.is_closed() {
            Err(PoolError::ShuttingDown)
        } else {
            Ok(())
        }
    }

    /// Refuse all further admissions and wake every waiter with an error
    ///
    /// Returns `true` only for the call that actually closed the gate.
    pub fn close(&self) -> bool {
        let first = !self.shutting_down.swap(true, Ordering::SeqCst);
        self.semaphore.close();
        first
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    #[inline]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}
