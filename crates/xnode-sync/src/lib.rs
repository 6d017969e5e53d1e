//! # xnode Sync
//!
//! Cancellable concurrency primitives underpinning the xnode feature
//! kernel and the features built on it.
//!
//! ## Components
//!
//! - [`AsyncMutex`] - async-aware mutual exclusion with a scoped guard
//! - [`WorkQueue`] - thread-safe FIFO queue in push or pull mode
//! - [`PeriodicTask`] - non-overlapping interval scheduler
//!
//! Every suspension point accepts a `CancellationToken`, typically a
//! child of one process-wide shutdown token, so a single trigger
//! unwinds all outstanding waits.

pub mod error;
pub mod mutex;
pub mod periodic;
pub mod queue;

pub use error::{BoxError, SyncError};
pub use mutex::{AsyncMutex, AsyncMutexGuard};
pub use periodic::PeriodicTask;
pub use queue::{DisposeHandle, WorkQueue};

pub use tokio_util::sync::CancellationToken;
