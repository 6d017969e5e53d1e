//! Dual-mode FIFO work queue.
//!
//! A queue is fixed in exactly one mode at construction:
//!
//! - **push**: a dedicated consumer task drains queued items one at a
//!   time into a user callback; callback invocations never overlap.
//! - **pull**: callers explicitly await the next item with
//!   [`WorkQueue::dequeue`].
//!
//! Items are delivered in enqueue order per producer; across producers
//! the queue only promises one consistent total order.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, trace};

use crate::error::{BoxError, SyncError};

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;

/// State shared between the queue handle and the push-mode consumer.
struct Shared<T> {
    items: Mutex<VecDeque<T>>,
    /// Signalled on enqueue.
    signal: Notify,
    /// Child of the caller's shutdown token; cancelled on disposal.
    token: CancellationToken,
    /// Pull mode: dequeues currently suspended or draining.
    pull_waiters: AtomicUsize,
    /// Signalled when `pull_waiters` drops to zero.
    idle: Notify,
}

impl<T> Shared<T> {
    fn new(shutdown: &CancellationToken) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            signal: Notify::new(),
            token: shutdown.child_token(),
            pull_waiters: AtomicUsize::new(0),
            idle: Notify::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Pull,
    Push,
}

/// Tracks one in-flight dequeue so disposal can wait for it to unwind.
struct InflightGuard<'a, T> {
    shared: &'a Shared<T>,
}

impl<'a, T> InflightGuard<'a, T> {
    fn register(shared: &'a Shared<T>) -> Self {
        shared.pull_waiters.fetch_add(1, Ordering::SeqCst);
        Self { shared }
    }
}

impl<T> Drop for InflightGuard<'_, T> {
    fn drop(&mut self) {
        if self.shared.pull_waiters.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.shared.idle.notify_waiters();
        }
    }
}

/// Requests disposal of a push-mode [`WorkQueue`] without waiting for
/// teardown.
///
/// This is the reentrancy-safe path for a consumer callback that needs
/// to dispose its own queue: the consumer loop performs teardown itself
/// after the current drain pass, so `request_dispose` returns before
/// teardown completes. Disposing from outside with
/// [`WorkQueue::dispose`] blocks until fully torn down.
#[derive(Debug, Clone)]
pub struct DisposeHandle {
    token: CancellationToken,
}

impl DisposeHandle {
    /// Flag the queue for shutdown and return immediately.
    pub fn request_dispose(&self) {
        self.token.cancel();
    }
}

/// Thread-safe FIFO queue in push or pull mode.
pub struct WorkQueue<T> {
    shared: Arc<Shared<T>>,
    mode: Mode,
    disposed: AtomicBool,
    consumer: Mutex<Option<JoinHandle<Result<(), SyncError>>>>,
}

impl<T: Send + 'static> WorkQueue<T> {
    /// Create a pull-mode queue; callers await items with [`dequeue`].
    ///
    /// [`dequeue`]: WorkQueue::dequeue
    pub fn pull(shutdown: &CancellationToken) -> Self {
        Self {
            shared: Arc::new(Shared::new(shutdown)),
            mode: Mode::Pull,
            disposed: AtomicBool::new(false),
            consumer: Mutex::new(None),
        }
    }

    /// Create a push-mode queue with a managed consumer loop.
    ///
    /// Queued items are delivered to `consume` one at a time, in FIFO
    /// order, never concurrently with itself. An error from `consume`
    /// is logged and terminates the loop; it resurfaces from
    /// [`WorkQueue::dispose`].
    pub fn push<F>(shutdown: &CancellationToken, consume: F) -> Self
    where
        F: FnMut(T) -> BoxFuture<'static, Result<(), BoxError>> + Send + 'static,
    {
        let shared = Arc::new(Shared::new(shutdown));
        let handle = tokio::spawn(run_consumer(shared.clone(), consume));
        Self {
            shared,
            mode: Mode::Push,
            disposed: AtomicBool::new(false),
            consumer: Mutex::new(Some(handle)),
        }
    }

    /// Append an item to the tail and signal waiters. Never suspends.
    ///
    /// After disposal the item is dropped.
    pub fn enqueue(&self, item: T) {
        if self.shared.token.is_cancelled() {
            trace!("enqueue after shutdown, dropping item");
            return;
        }
        self.shared.items.lock().push_back(item);
        self.shared.signal.notify_one();
    }

    /// Await the next item in FIFO order (pull mode only).
    ///
    /// Suspends while the queue is empty. Fails with
    /// [`SyncError::Cancelled`] when `token` fires or the queue is
    /// disposed; the caller receives no item in that case.
    pub async fn dequeue(&self, token: &CancellationToken) -> Result<T, SyncError> {
        if self.mode == Mode::Push {
            return Err(SyncError::PushMode);
        }

        let _inflight = InflightGuard::register(&self.shared);
        loop {
            if self.shared.token.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            if let Some(item) = self.shared.items.lock().pop_front() {
                return Ok(item);
            }

            let notified = self.shared.signal.notified();
            // An item may have arrived between the pop and registration.
            if let Some(item) = self.shared.items.lock().pop_front() {
                return Ok(item);
            }
            tokio::select! {
                _ = notified => {}
                _ = token.cancelled() => return Err(SyncError::Cancelled),
                _ = self.shared.token.cancelled() => return Err(SyncError::Cancelled),
            }
        }
    }

    /// Take the next item without suspending (pull mode only).
    ///
    /// Returns `None` when the queue is empty, disposed, or in push
    /// mode.
    pub fn try_dequeue(&self) -> Option<T> {
        if self.mode == Mode::Push || self.shared.token.is_cancelled() {
            return None;
        }
        self.shared.items.lock().pop_front()
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.shared.items.lock().len()
    }

    /// Whether the queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.shared.items.lock().is_empty()
    }

    /// Handle for requesting disposal from within the consumer callback.
    pub fn dispose_handle(&self) -> DisposeHandle {
        DisposeHandle {
            token: self.shared.token.clone(),
        }
    }

    /// Shut the queue down. Idempotent.
    ///
    /// Push mode: waits for the consumer loop to finish its current
    /// callback and exit, then reports any consumer failure. Pull mode:
    /// waits for every outstanding [`dequeue`] to observe cancellation
    /// and unwind.
    ///
    /// Must not be awaited from within the consumer callback itself;
    /// use [`WorkQueue::dispose_handle`] there instead.
    ///
    /// [`dequeue`]: WorkQueue::dequeue
    pub async fn dispose(&self) -> Result<(), SyncError> {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.shared.token.cancel();

        match self.mode {
            Mode::Push => {
                let handle = self.consumer.lock().take();
                match handle {
                    Some(handle) => match handle.await {
                        Ok(result) => result,
                        Err(e) => Err(SyncError::Consumer(Box::new(e))),
                    },
                    None => Ok(()),
                }
            }
            Mode::Pull => {
                loop {
                    let idle = self.shared.idle.notified();
                    if self.shared.pull_waiters.load(Ordering::SeqCst) == 0 {
                        break;
                    }
                    idle.await;
                }
                Ok(())
            }
        }
    }
}

impl<T> Drop for WorkQueue<T> {
    fn drop(&mut self) {
        // Stop the consumer loop even if the queue was never disposed.
        self.shared.token.cancel();
    }
}

impl<T> std::fmt::Debug for WorkQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkQueue")
            .field("mode", &self.mode)
            .field("len", &self.shared.items.lock().len())
            .finish()
    }
}

/// Push-mode consumer loop: wait for the signal, drain everything
/// queued, wait again. Teardown happens from this task when disposal is
/// requested mid-drain.
async fn run_consumer<T, F>(shared: Arc<Shared<T>>, mut consume: F) -> Result<(), SyncError>
where
    T: Send + 'static,
    F: FnMut(T) -> BoxFuture<'static, Result<(), BoxError>> + Send + 'static,
{
    loop {
        // Drain pass: one item at a time, stopping after the current
        // callback once disposal has been requested.
        while !shared.token.is_cancelled() {
            let item = shared.items.lock().pop_front();
            let Some(item) = item else { break };
            if let Err(e) = consume(item).await {
                error!(error = %e, "work queue consumer failed, stopping the loop");
                // Nothing will drain the queue anymore; shut the intake
                // down so later enqueues drop instead of accumulating.
                shared.token.cancel();
                return Err(SyncError::Consumer(e));
            }
        }

        if shared.token.is_cancelled() {
            return Ok(());
        }

        let notified = shared.signal.notified();
        // An item may have been enqueued between the drain and
        // registration; skip the wait in that case.
        if !shared.items.lock().is_empty() {
            continue;
        }
        tokio::select! {
            _ = notified => {}
            _ = shared.token.cancelled() => return Ok(()),
        }
    }
}
