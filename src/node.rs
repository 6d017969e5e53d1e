//! Node assembly: wires the built-in features through the kernel.

use std::sync::Arc;

use tracing::{error, info};

use xnode_kernel::{CancellationToken, FeatureKernel};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::features::{HeartbeatFeature, StorageFeature, StorageHandle};

/// Build the feature graph, run until `shutdown` fires, then dispose.
///
/// A startup failure returns before the node ever reports ready.
pub async fn run(config: NodeConfig, shutdown: CancellationToken) -> Result<(), NodeError> {
    let mut kernel = FeatureKernel::new(shutdown.clone());

    {
        let data_dir = config.data_dir.clone();
        let handle_dir = config.data_dir.clone();
        kernel
            .add_feature::<StorageFeature, _>(move |_| StorageFeature::new(data_dir))?
            .feature_services(move |services| {
                services.register(Arc::new(StorageHandle::new(handle_dir)));
            });
    }
    {
        let heartbeat = config.heartbeat.clone();
        let token = shutdown.clone();
        kernel
            .add_feature::<HeartbeatFeature, _>(move |services| {
                HeartbeatFeature::new(heartbeat, services.get::<StorageHandle>(), token)
            })?
            .depend_on::<StorageFeature>();
    }

    let mut executor = kernel.build();
    executor.initialize().await?;
    info!("node ready");

    shutdown.cancelled().await;
    info!("shutdown requested");

    if let Err(e) = executor.dispose().await {
        error!(error = %e, "feature disposal reported failures");
        return Err(e.into());
    }
    info!("node stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn node_starts_and_stops_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig {
            data_dir: dir.path().join("data"),
            ..NodeConfig::default()
        };

        let shutdown = CancellationToken::new();
        let node = tokio::spawn(run(config, shutdown.clone()));

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        shutdown.cancel();

        node.await.unwrap().unwrap();
        assert!(dir.path().join("data").is_dir());
    }

    #[tokio::test]
    async fn independent_nodes_do_not_share_shutdown() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        let shutdown_a = CancellationToken::new();
        let shutdown_b = CancellationToken::new();

        let node_a = tokio::spawn(run(
            NodeConfig {
                data_dir: dir_a.path().join("data"),
                ..NodeConfig::default()
            },
            shutdown_a.clone(),
        ));
        let node_b = tokio::spawn(run(
            NodeConfig {
                data_dir: dir_b.path().join("data"),
                ..NodeConfig::default()
            },
            shutdown_b.clone(),
        ));

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        shutdown_a.cancel();
        node_a.await.unwrap().unwrap();

        // Node B is unaffected by node A's shutdown.
        assert!(!node_b.is_finished());
        shutdown_b.cancel();
        node_b.await.unwrap().unwrap();
    }
}
