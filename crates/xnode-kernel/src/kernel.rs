//! Kernel facade bundling registration, services and shutdown.

use tokio_util::sync::CancellationToken;

use crate::error::FeatureError;
use crate::executor::FeatureExecutor;
use crate::feature::Feature;
use crate::registry::{FeatureRegistration, FeatureRegistry};
use crate::services::{ServiceCollection, ServiceProvider};

/// Bundles a [`FeatureRegistry`], a [`ServiceCollection`] and one
/// process-lifetime shutdown token.
///
/// The token is passed in explicitly, never ambient, so independent
/// kernels can coexist in tests.
pub struct FeatureKernel {
    registry: FeatureRegistry,
    services: ServiceCollection,
    shutdown: CancellationToken,
}

impl FeatureKernel {
    /// Create a kernel wired to `shutdown`.
    pub fn new(shutdown: CancellationToken) -> Self {
        Self {
            registry: FeatureRegistry::new(),
            services: ServiceCollection::new(),
            shutdown,
        }
    }

    /// Register a feature type. See [`FeatureRegistry::add_feature`].
    pub fn add_feature<T, F>(&mut self, factory: F) -> Result<&mut FeatureRegistration, FeatureError>
    where
        T: Feature + 'static,
        F: FnOnce(&ServiceProvider) -> T + Send + 'static,
    {
        self.registry.add_feature::<T, F>(factory)
    }

    /// Services shared by all features, open for registration until
    /// [`FeatureKernel::build`].
    pub fn services(&mut self) -> &mut ServiceCollection {
        &mut self.services
    }

    /// The process-lifetime shutdown token this kernel was built with.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Build the live feature graph and hand it to an executor.
    pub fn build(self) -> FeatureExecutor {
        self.registry.build(self.services, &self.shutdown)
    }
}

impl std::fmt::Debug for FeatureKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureKernel")
            .field("features", &self.registry.feature_names())
            .finish()
    }
}
