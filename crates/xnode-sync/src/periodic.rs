//! Non-overlapping periodic scheduler.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::{BoxError, SyncError};

#[cfg(test)]
#[path = "periodic_tests.rs"]
mod tests;

/// Runs a unit of work repeatedly on an interval until cancelled.
///
/// The first invocation runs after `start_after`, then every
/// `repeat_every`. Exactly one invocation runs at a time: the loop
/// awaits each body to completion, and an overrunning invocation delays
/// the next one rather than queueing a catch-up batch.
///
/// An error from the body is logged and re-raised out of the task,
/// terminating the schedule permanently. Resilience to transient errors
/// belongs inside the body itself.
pub struct PeriodicTask {
    name: String,
    token: CancellationToken,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<Result<(), BoxError>>>>,
}

impl PeriodicTask {
    /// Schedule `work` under `name`, linked to `shutdown`.
    pub fn schedule<F>(
        name: impl Into<String>,
        shutdown: &CancellationToken,
        repeat_every: Duration,
        start_after: Duration,
        mut work: F,
    ) -> Self
    where
        F: FnMut() -> BoxFuture<'static, Result<(), BoxError>> + Send + 'static,
    {
        let name = name.into();
        let token = shutdown.child_token();
        let running = Arc::new(AtomicBool::new(true));

        let handle = {
            let name = name.clone();
            let token = token.clone();
            let running = running.clone();
            tokio::spawn(async move {
                let mut timer =
                    tokio::time::interval_at(Instant::now() + start_after, repeat_every);
                // An overrun delays the next tick instead of bursting.
                timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

                debug!(task = %name, ?repeat_every, ?start_after, "periodic task scheduled");

                let result = loop {
                    tokio::select! {
                        _ = token.cancelled() => {
                            debug!(task = %name, "periodic task cancelled");
                            break Ok(());
                        }
                        _ = timer.tick() => {}
                    }
                    if let Err(e) = work().await {
                        error!(task = %name, error = %e, "periodic task failed, stopping");
                        break Err(e);
                    }
                };
                running.store(false, Ordering::SeqCst);
                result
            })
        };

        Self {
            name,
            token,
            running,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Diagnostic name of the task.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the loop is still alive.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Request cancellation without waiting for the loop to exit.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancel the task and wait for the loop to exit.
    ///
    /// Surfaces the body error if the loop already terminated on one.
    pub async fn dispose(&self) -> Result<(), SyncError> {
        self.token.cancel();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            match handle.await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(source)) => Err(SyncError::Task {
                    name: self.name.clone(),
                    source,
                }),
                Err(e) => Err(SyncError::Task {
                    name: self.name.clone(),
                    source: Box::new(e),
                }),
            }
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for PeriodicTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicTask")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish()
    }
}
