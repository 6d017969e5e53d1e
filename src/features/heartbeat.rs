//! Heartbeat feature: periodic liveness ticks drained through a
//! push-mode work queue into the status file.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{debug, info};

use xnode_kernel::{Feature, FeatureError, ServiceProvider};
use xnode_sync::{CancellationToken, PeriodicTask, SyncError, WorkQueue};

use crate::config::HeartbeatConfig;
use crate::features::storage::StorageHandle;

struct Beat {
    sequence: u64,
    uptime: Duration,
}

/// Emits a heartbeat every configured interval. Depends on the storage
/// feature for the status file.
pub struct HeartbeatFeature {
    config: HeartbeatConfig,
    shutdown: CancellationToken,
    storage: Option<Arc<StorageHandle>>,
    task: Option<PeriodicTask>,
    queue: Option<Arc<WorkQueue<Beat>>>,
}

impl HeartbeatFeature {
    pub fn new(
        config: HeartbeatConfig,
        storage: Option<Arc<StorageHandle>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            shutdown,
            storage,
            task: None,
            queue: None,
        }
    }
}

#[async_trait]
impl Feature for HeartbeatFeature {
    fn validate_dependencies(&self, services: &ServiceProvider) -> Result<(), FeatureError> {
        if self.storage.is_none() || !services.contains::<StorageHandle>() {
            return Err(FeatureError::Custom(
                "heartbeat requires the storage handle service".to_string(),
            ));
        }
        Ok(())
    }

    async fn initialize(&mut self) -> Result<(), FeatureError> {
        let storage = self
            .storage
            .clone()
            .ok_or_else(|| FeatureError::Custom("storage handle missing".to_string()))?;
        let started = Instant::now();

        let queue = Arc::new(WorkQueue::push(&self.shutdown, {
            let storage = storage.clone();
            let shutdown = self.shutdown.clone();
            move |beat: Beat| {
                let storage = storage.clone();
                let shutdown = shutdown.clone();
                async move {
                    debug!(
                        sequence = beat.sequence,
                        uptime_secs = beat.uptime.as_secs(),
                        "heartbeat"
                    );
                    let status = format!("alive {}\n", beat.sequence);
                    match storage.write_status(&shutdown, &status).await {
                        // A cancelled write means the node is stopping.
                        Err(SyncError::Cancelled) => Ok(()),
                        other => other.map_err(Into::into),
                    }
                }
                .boxed()
            }
        }));

        let task = PeriodicTask::schedule(
            "heartbeat",
            &self.shutdown,
            self.config.interval(),
            self.config.start_delay(),
            {
                let queue = queue.clone();
                let mut sequence = 0u64;
                move || {
                    sequence += 1;
                    queue.enqueue(Beat {
                        sequence,
                        uptime: started.elapsed(),
                    });
                    async { Ok(()) }.boxed()
                }
            },
        );

        self.queue = Some(queue);
        self.task = Some(task);
        info!(interval = ?self.config.interval(), "heartbeat started");
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), FeatureError> {
        if let Some(task) = self.task.take() {
            task.dispose()
                .await
                .map_err(|e| FeatureError::Other(Box::new(e)))?;
        }
        if let Some(queue) = self.queue.take() {
            queue
                .dispose()
                .await
                .map_err(|e| FeatureError::Other(Box::new(e)))?;
        }
        info!("heartbeat stopped");
        Ok(())
    }
}
