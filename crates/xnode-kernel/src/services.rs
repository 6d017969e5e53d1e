//! Typed singleton service container.
//!
//! Mutated only during the single-threaded build phase; read-only
//! thereafter, so the maps need no locking.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Singleton services registered by type, collected while the feature
/// graph is being built.
#[derive(Default)]
pub struct ServiceCollection {
    singletons: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ServiceCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a singleton, replacing any previous registration of the
    /// same type.
    pub fn register<T: Send + Sync + 'static>(&mut self, service: Arc<T>) {
        self.singletons.insert(TypeId::of::<T>(), service);
    }

    /// Check whether a singleton of type `T` is registered.
    pub fn contains<T: 'static>(&self) -> bool {
        self.singletons.contains_key(&TypeId::of::<T>())
    }

    pub(crate) fn into_provider(
        self,
        features: HashMap<TypeId, &'static str>,
    ) -> ServiceProvider {
        ServiceProvider {
            singletons: self.singletons,
            features,
        }
    }
}

impl std::fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCollection")
            .field("singletons", &self.singletons.len())
            .finish()
    }
}

/// Read-only view over the built service graph, handed to features for
/// dependency validation and service resolution.
pub struct ServiceProvider {
    singletons: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    features: HashMap<TypeId, &'static str>,
}

impl ServiceProvider {
    /// Resolve a singleton by type.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.singletons
            .get(&TypeId::of::<T>())
            .and_then(|service| service.clone().downcast::<T>().ok())
    }

    /// Check whether a singleton of type `T` is registered.
    pub fn contains<T: 'static>(&self) -> bool {
        self.singletons.contains_key(&TypeId::of::<T>())
    }

    /// Check whether a feature type is part of the graph.
    pub fn has_feature(&self, type_id: TypeId) -> bool {
        self.features.contains_key(&type_id)
    }

    /// Typed convenience for [`ServiceProvider::has_feature`].
    pub fn has_feature_type<T: 'static>(&self) -> bool {
        self.has_feature(TypeId::of::<T>())
    }
}

impl std::fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("singletons", &self.singletons.len())
            .field("features", &self.features.len())
            .finish()
    }
}
