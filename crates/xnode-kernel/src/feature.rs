//! The feature lifecycle trait.

use async_trait::async_trait;

use crate::error::FeatureError;
use crate::services::ServiceProvider;

/// An independently pluggable unit of server functionality.
///
/// Lifecycle: constructed once when the feature graph is built;
/// `validate_dependencies` and `initialize` run exactly once each
/// during startup; `shutdown` runs exactly once during shutdown,
/// including after a partial startup failure.
#[async_trait]
pub trait Feature: Send + Sync {
    /// Whether this feature initializes ahead of the base features.
    /// Ties fall back to registration order.
    fn initialize_before_base(&self) -> bool {
        false
    }

    /// Validate that the services this feature needs are present.
    /// Runs immediately before [`Feature::initialize`].
    fn validate_dependencies(&self, _services: &ServiceProvider) -> Result<(), FeatureError> {
        Ok(())
    }

    /// Bring the feature up. A failure aborts the remaining startup.
    async fn initialize(&mut self) -> Result<(), FeatureError>;

    /// Bring the feature down and release its resources. Failures are
    /// collected but never block sibling cleanup.
    async fn shutdown(&mut self) -> Result<(), FeatureError>;
}
