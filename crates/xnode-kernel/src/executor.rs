//! Two-phase feature lifecycle execution.
//!
//! Startup is sequential and fail-fast: a broken dependency makes
//! continuing unsafe. Shutdown is sequential, reverse-ordered and
//! best-effort: every feature likely holds a resource that must be
//! released regardless of its siblings, so errors are collected and
//! raised only after every feature was given a chance to shut down.

use std::any::TypeId;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::FeatureError;
use crate::feature::Feature;
use crate::services::ServiceProvider;

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;

/// A built feature instance together with its declarative record.
pub(crate) struct FeatureEntry {
    name: &'static str,
    dependencies: Vec<(TypeId, &'static str)>,
    instance: Box<dyn Feature>,
}

impl FeatureEntry {
    pub(crate) fn new(
        name: &'static str,
        dependencies: Vec<(TypeId, &'static str)>,
        instance: Box<dyn Feature>,
    ) -> Self {
        Self {
            name,
            dependencies,
            instance,
        }
    }
}

/// Runs the ordered two-phase startup and the reverse-order shutdown
/// over the built feature graph.
pub struct FeatureExecutor {
    entries: Vec<FeatureEntry>,
    services: Arc<ServiceProvider>,
    token: CancellationToken,
    disposed: bool,
}

impl FeatureExecutor {
    pub(crate) fn new(
        entries: Vec<FeatureEntry>,
        services: Arc<ServiceProvider>,
        token: CancellationToken,
    ) -> Self {
        Self {
            entries,
            services,
            token,
            disposed: false,
        }
    }

    /// The built service graph.
    pub fn services(&self) -> Arc<ServiceProvider> {
        self.services.clone()
    }

    /// Shutdown token cancelled when [`FeatureExecutor::dispose`] runs;
    /// features derive their loop tokens from it.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.token
    }

    /// Initialize phase: sequential, fail-fast.
    ///
    /// Every declared dependency is checked against all registered
    /// types before any feature initializes; all missing edges fail the
    /// whole startup as one aggregate. Features then initialize ordered
    /// by `initialize_before_base` descending (registration order
    /// otherwise); the first failure aborts the remaining phase.
    pub async fn initialize(&mut self) -> Result<(), FeatureError> {
        let mut missing = Vec::new();
        for entry in &self.entries {
            for (dep_id, dep_name) in &entry.dependencies {
                if !self.services.has_feature(*dep_id) {
                    missing.push(FeatureError::DependencyMissing {
                        feature: entry.name,
                        dependency: dep_name,
                    });
                }
            }
        }
        if !missing.is_empty() {
            error!(
                missing = missing.len(),
                "unsatisfied feature dependencies, aborting startup"
            );
            return Err(FeatureError::aggregate(missing));
        }

        let services = self.services.clone();

        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        order.sort_by_key(|&i| !self.entries[i].instance.initialize_before_base());

        for index in order {
            let entry = &mut self.entries[index];
            info!(feature = entry.name, "initializing feature");

            let result = match entry.instance.validate_dependencies(&services) {
                Ok(()) => entry.instance.initialize().await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                error!(
                    feature = entry.name,
                    error = %e,
                    "feature initialization failed, aborting startup"
                );
                return Err(FeatureError::aggregate(vec![FeatureError::Initialize {
                    feature: entry.name,
                    source: Box::new(e),
                }]));
            }
        }

        info!(features = self.entries.len(), "all features initialized");
        Ok(())
    }

    /// Dispose phase: sequential, best-effort, exact reverse
    /// registration order. Idempotent.
    ///
    /// Every built instance is shut down regardless of earlier
    /// failures, including instances whose `initialize` never ran after
    /// a partial startup failure. Errors are logged, collected, and
    /// raised as one aggregate only after every feature was attempted.
    pub async fn dispose(&mut self) -> Result<(), FeatureError> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;
        self.token.cancel();

        let mut errors = Vec::new();
        for entry in self.entries.iter_mut().rev() {
            info!(feature = entry.name, "shutting down feature");
            if let Err(e) = entry.instance.shutdown().await {
                error!(feature = entry.name, error = %e, "feature shutdown failed");
                errors.push(FeatureError::Shutdown {
                    feature: entry.name,
                    source: Box::new(e),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(FeatureError::aggregate(errors))
        }
    }
}

impl std::fmt::Debug for FeatureExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureExecutor")
            .field("features", &self.entries.len())
            .field("disposed", &self.disposed)
            .finish()
    }
}
