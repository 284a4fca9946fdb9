//! The adapter registry: one weakly-cached adapter per service type.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::services::{
    GenericServices, TypedDataBroker, TypedNotificationService, TypedRpcConsumerRegistry,
    TypedRpcProviderRegistry,
};

type AdapterFactory = Box<dyn Fn(&GenericServices) -> Arc<dyn Any + Send + Sync> + Send + Sync>;

/// Builds and caches typed service adapters over one delegate bundle.
///
/// Adapters are held weakly: an adapter nobody references is reclaimed and
/// rebuilt on the next request. Construction is a pure function of the
/// service type and the delegates, so rebuilding yields an equivalent
/// adapter.
pub struct AdapterRegistry {
    services: GenericServices,
    factories: HashMap<TypeId, AdapterFactory>,
    cache: Mutex<HashMap<TypeId, Weak<dyn Any + Send + Sync>>>,
}

impl AdapterRegistry {
    /// An empty registry; add factories with [`with_factory`](Self::with_factory).
    pub fn new(services: GenericServices) -> Self {
        Self {
            services,
            factories: HashMap::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// A registry serving the standard typed services.
    pub fn with_defaults(services: GenericServices) -> Self {
        Self::new(services)
            .with_factory(TypedDataBroker::new)
            .with_factory(TypedNotificationService::new)
            .with_factory(TypedRpcConsumerRegistry::new)
            .with_factory(TypedRpcProviderRegistry::new)
    }

    /// Register a factory for one service type, replacing any earlier one.
    pub fn with_factory<S>(
        mut self,
        factory: impl Fn(GenericServices) -> S + Send + Sync + 'static,
    ) -> Self
    where
        S: Any + Send + Sync,
    {
        self.factories.insert(
            TypeId::of::<S>(),
            Box::new(move |services| Arc::new(factory(services.clone()))),
        );
        self
    }

    /// The adapter for a service type, building it if no live instance is
    /// cached.
    pub fn get<S>(&self) -> RegistryResult<Arc<S>>
    where
        S: Any + Send + Sync,
    {
        let key = TypeId::of::<S>();
        let factory = self
            .factories
            .get(&key)
            .ok_or(RegistryError::UnsupportedService(type_name::<S>()))?;
        let mut cache = self.cache.lock().expect("registry lock poisoned");
        if let Some(alive) = cache.get(&key).and_then(Weak::upgrade) {
            if let Ok(typed) = alive.downcast::<S>() {
                return Ok(typed);
            }
        }
        debug!(service = type_name::<S>(), "building service adapter");
        let built = factory(&self.services);
        cache.insert(key, Arc::downgrade(&built));
        built
            .downcast::<S>()
            .map_err(|_| RegistryError::UnsupportedService(type_name::<S>()))
    }
}
