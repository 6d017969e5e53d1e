//! Primitive errors.

use thiserror::Error;

/// Boxed error type carried by user-supplied work bodies and consumers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the concurrency primitives.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The wait was cancelled before completion. The caller holds
    /// nothing and must not release anything.
    #[error("operation cancelled")]
    Cancelled,

    /// A dequeue was attempted on a push-mode queue.
    #[error("queue is in push mode, items are delivered to the consumer")]
    PushMode,

    /// The push-mode consumer callback failed, terminating the loop.
    #[error("consumer failed: {0}")]
    Consumer(#[source] BoxError),

    /// A periodic task body failed, terminating the schedule.
    #[error("periodic task '{name}' failed: {source}")]
    Task {
        name: String,
        #[source]
        source: BoxError,
    },
}
