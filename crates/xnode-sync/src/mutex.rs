//! Async-aware mutual exclusion.

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::error::SyncError;

#[cfg(test)]
#[path = "mutex_tests.rs"]
mod tests;

/// Asynchronous mutual exclusion lock.
///
/// One owner at a time over a capacity-1 semaphore. Acquisition tries a
/// non-blocking path first; only a contended acquire suspends. The
/// returned [`AsyncMutexGuard`] releases the lock when dropped.
///
/// The guard borrows the mutex, so dropping the mutex while a guard is
/// live is rejected at compile time.
pub struct AsyncMutex {
    semaphore: Semaphore,
}

impl AsyncMutex {
    /// Create a new, unowned mutex.
    pub fn new() -> Self {
        Self {
            semaphore: Semaphore::new(1),
        }
    }

    /// Attempt to acquire without suspending.
    pub fn try_acquire(&self) -> Option<AsyncMutexGuard<'_>> {
        match self.semaphore.try_acquire() {
            Ok(permit) => {
                permit.forget();
                Some(AsyncMutexGuard { mutex: self })
            }
            Err(_) => None,
        }
    }

    /// Acquire the mutex, suspending until it is free or `token` fires.
    ///
    /// On cancellation the mutex is not held and [`SyncError::Cancelled`]
    /// is returned; the caller must not release.
    pub async fn acquire(&self, token: &CancellationToken) -> Result<AsyncMutexGuard<'_>, SyncError> {
        if let Some(guard) = self.try_acquire() {
            return Ok(guard);
        }

        tokio::select! {
            permit = self.semaphore.acquire() => {
                // The semaphore is never closed.
                let permit = permit.expect("mutex semaphore closed");
                permit.forget();
                Ok(AsyncMutexGuard { mutex: self })
            }
            _ = token.cancelled() => Err(SyncError::Cancelled),
        }
    }

    /// Blocking acquisition for call sites outside cooperative flow.
    ///
    /// Must not be called from within the async runtime; it parks the
    /// current thread until the mutex is free.
    pub fn acquire_blocking(&self) -> AsyncMutexGuard<'_> {
        if let Some(guard) = self.try_acquire() {
            return guard;
        }

        let permit = futures::executor::block_on(self.semaphore.acquire())
            .expect("mutex semaphore closed");
        permit.forget();
        AsyncMutexGuard { mutex: self }
    }

    /// Whether the mutex is currently owned.
    pub fn is_locked(&self) -> bool {
        self.semaphore.available_permits() == 0
    }
}

impl Default for AsyncMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AsyncMutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncMutex")
            .field("locked", &self.is_locked())
            .finish()
    }
}

/// Scoped ownership of an [`AsyncMutex`]; dropping it releases the lock.
///
/// Guards only come from a successful acquisition, so releasing without
/// holding is impossible by construction.
#[must_use = "the mutex is released as soon as the guard is dropped"]
pub struct AsyncMutexGuard<'a> {
    mutex: &'a AsyncMutex,
}

impl Drop for AsyncMutexGuard<'_> {
    fn drop(&mut self) {
        self.mutex.semaphore.add_permits(1);
    }
}

impl std::fmt::Debug for AsyncMutexGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AsyncMutexGuard")
    }
}
