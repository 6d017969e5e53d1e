//! Declarative feature registration.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::FeatureError;
use crate::executor::{FeatureEntry, FeatureExecutor};
use crate::feature::Feature;
use crate::services::{ServiceCollection, ServiceProvider};

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

type ServiceConfigure = Box<dyn FnOnce(&mut ServiceCollection) + Send>;
type FeatureFactory = Box<dyn FnOnce(&ServiceProvider) -> Box<dyn Feature> + Send>;

/// The declarative record of one registered feature: its type identity,
/// declared dependencies, ordered configuration callbacks, and the
/// factory producing the live instance.
pub struct FeatureRegistration {
    type_id: TypeId,
    type_name: &'static str,
    dependencies: Vec<(TypeId, &'static str)>,
    service_callbacks: Vec<ServiceConfigure>,
    startup: Option<ServiceConfigure>,
    factory: FeatureFactory,
}

impl FeatureRegistration {
    /// Declare a dependency on another feature type. Checked for the
    /// whole registry before any feature initializes.
    pub fn depend_on<U: Feature + 'static>(&mut self) -> &mut Self {
        self.dependencies
            .push((TypeId::of::<U>(), std::any::type_name::<U>()));
        self
    }

    /// Append a configuration callback, applied in registration order
    /// when the service graph is built.
    pub fn feature_services<F>(&mut self, configure: F) -> &mut Self
    where
        F: FnOnce(&mut ServiceCollection) + Send + 'static,
    {
        self.service_callbacks.push(Box::new(configure));
        self
    }

    /// Designate a startup hook, invoked exactly once at build after
    /// this feature's service callbacks.
    pub fn startup<F>(&mut self, configure: F) -> &mut Self
    where
        F: FnOnce(&mut ServiceCollection) + Send + 'static,
    {
        self.startup = Some(Box::new(configure));
        self
    }

    /// Registered type name, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl std::fmt::Debug for FeatureRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureRegistration")
            .field("type_name", &self.type_name)
            .field("dependencies", &self.dependencies.len())
            .finish()
    }
}

/// Insertion-ordered collection of feature registrations.
///
/// Mutated only during the single-threaded registration phase; no two
/// registrations may share a type identity.
#[derive(Default)]
pub struct FeatureRegistry {
    registrations: Vec<FeatureRegistration>,
}

impl FeatureRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a feature type with the factory that will build its
    /// live instance. Registering the same type twice fails
    /// immediately, naming the type.
    pub fn add_feature<T, F>(&mut self, factory: F) -> Result<&mut FeatureRegistration, FeatureError>
    where
        T: Feature + 'static,
        F: FnOnce(&ServiceProvider) -> T + Send + 'static,
    {
        let type_id = TypeId::of::<T>();
        let type_name = std::any::type_name::<T>();

        if self.registrations.iter().any(|r| r.type_id == type_id) {
            return Err(FeatureError::Duplicate(type_name));
        }

        debug!(feature = type_name, "feature registered");
        self.registrations.push(FeatureRegistration {
            type_id,
            type_name,
            dependencies: Vec::new(),
            service_callbacks: Vec::new(),
            startup: None,
            factory: Box::new(move |services| Box::new(factory(services))),
        });

        let last = self.registrations.len() - 1;
        Ok(&mut self.registrations[last])
    }

    /// Number of registered features.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Registered type names in registration order.
    pub fn feature_names(&self) -> Vec<&'static str> {
        self.registrations.iter().map(|r| r.type_name).collect()
    }

    /// Build the live feature graph: per registration, in order, run
    /// the configuration callbacks, invoke the startup hook once, then
    /// construct the instance from the finished service graph.
    pub fn build(self, services: ServiceCollection, shutdown: &CancellationToken) -> FeatureExecutor {
        let mut services = services;
        let features: HashMap<TypeId, &'static str> = self
            .registrations
            .iter()
            .map(|r| (r.type_id, r.type_name))
            .collect();

        let mut pending = Vec::with_capacity(self.registrations.len());
        for registration in self.registrations {
            for configure in registration.service_callbacks {
                configure(&mut services);
            }
            if let Some(startup) = registration.startup {
                debug!(feature = registration.type_name, "running startup hook");
                startup(&mut services);
            }
            pending.push((
                registration.type_name,
                registration.dependencies,
                registration.factory,
            ));
        }

        let provider = Arc::new(services.into_provider(features));

        let entries = pending
            .into_iter()
            .map(|(name, dependencies, factory)| {
                FeatureEntry::new(name, dependencies, factory(&provider))
            })
            .collect();

        FeatureExecutor::new(entries, provider, shutdown.child_token())
    }
}

impl std::fmt::Debug for FeatureRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureRegistry")
            .field("features", &self.feature_names())
            .finish()
    }
}
