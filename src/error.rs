//! Node-level errors.

use thiserror::Error;

use xnode_kernel::FeatureError;

/// Errors surfaced by the node binary.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse failed: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Feature(#[from] FeatureError),
}
