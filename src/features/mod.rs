//! Built-in node features.

pub mod heartbeat;
pub mod storage;

pub use heartbeat::HeartbeatFeature;
pub use storage::{StorageFeature, StorageHandle};
