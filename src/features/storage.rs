//! Storage feature: owns the node's data directory.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use xnode_kernel::{Feature, FeatureError};
use xnode_sync::{AsyncMutex, CancellationToken, SyncError};

/// Shared handle to the node's data directory, published as a service
/// so dependent features can persist state.
pub struct StorageHandle {
    data_dir: PathBuf,
    /// Serializes status-file writes across features.
    status_lock: AsyncMutex,
}

impl StorageHandle {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            status_lock: AsyncMutex::new(),
        }
    }

    /// Overwrite the node status file. Concurrent writers are
    /// serialized; a cancelled wait leaves the file untouched.
    pub async fn write_status(
        &self,
        token: &CancellationToken,
        status: &str,
    ) -> Result<(), SyncError> {
        let _guard = self.status_lock.acquire(token).await?;
        let path = self.data_dir.join("status");
        if let Err(e) = tokio::fs::write(&path, status).await {
            tracing::warn!(path = %path.display(), error = %e, "status write failed");
        }
        Ok(())
    }
}

/// Creates the data directory before anything depends on it.
pub struct StorageFeature {
    data_dir: PathBuf,
}

impl StorageFeature {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }
}

#[async_trait]
impl Feature for StorageFeature {
    fn initialize_before_base(&self) -> bool {
        true
    }

    async fn initialize(&mut self) -> Result<(), FeatureError> {
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| {
                FeatureError::Custom(format!(
                    "create data dir {}: {e}",
                    self.data_dir.display()
                ))
            })?;
        info!(data_dir = %self.data_dir.display(), "storage ready");
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), FeatureError> {
        info!("storage feature stopped");
        Ok(())
    }
}
