//! Builder API for creating cache instances.
//!
//! This module wires a store, the process-wide configuration and the model
//! types that plain tag strings may refer to into a [`ModelCache`].

use std::sync::Arc;

use crate::config::CacheConfig;
use crate::memo::ModelCache;
use crate::model::Cachable;
use crate::store::Store;
use crate::tags::ModelRegistry;

/// Builder for [`ModelCache`].
///
/// # Example
///
/// ```ignore
/// use model_cache::{CacheConfig, HashMapStore, HashMapStoreConfig, ModelCacheBuilder};
/// use std::sync::Arc;
///
/// let memory = Arc::new(HashMapStore::new(HashMapStoreConfig::default()));
///
/// let cache = ModelCacheBuilder::new(memory)
///     .config(CacheConfig::from_env())
///     .register::<Post>()
///     .register::<Author>()
///     .build();
///
/// // Entity stores notify the cache through its observer
/// repository.observe(Arc::new(cache.observer()));
/// ```
pub struct ModelCacheBuilder {
    store: Arc<dyn Store>,
    config: CacheConfig,
    registry: ModelRegistry,
}

impl ModelCacheBuilder {
    /// Create a new builder over `store` with the default configuration.
    pub fn new(store: Arc<dyn Store>) -> Self {
        ModelCacheBuilder {
            store,
            config: CacheConfig::default(),
            registry: ModelRegistry::new(),
        }
    }

    /// Replace the configuration.
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Let plain tag strings naming `T` resolve to its type tag.
    pub fn register<T: Cachable>(mut self) -> Self {
        self.registry.register::<T>();
        self
    }

    /// Build the cache.
    pub fn build(self) -> ModelCache {
        ModelCache::new(self.store, self.config, self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::memory::{HashMapStore, HashMapStoreConfig};
    use crate::ttl::ExpireAfter;

    struct Author;

    impl Cachable for Author {
        fn cache_id(&self) -> String {
            "1".to_string()
        }
    }

    #[test]
    fn test_builder_defaults() {
        let store = Arc::new(HashMapStore::new(HashMapStoreConfig::default()));
        let cache = ModelCacheBuilder::new(store).build();

        assert!(cache.config().enabled);
        assert_eq!(cache.config().default_ttl, ExpireAfter::Forever);
        assert!(cache.registry().is_empty());
        assert_eq!(cache.store().name(), "hashmap");
    }

    #[test]
    fn test_builder_config_and_registry() {
        let store = Arc::new(HashMapStore::new(HashMapStoreConfig::default()));
        let cache = ModelCacheBuilder::new(store)
            .config(CacheConfig::disabled().with_default_ttl(ExpireAfter::OneDay))
            .register::<Author>()
            .build();

        assert!(!cache.config().enabled);
        assert_eq!(cache.config().default_ttl, ExpireAfter::OneDay);
        assert_eq!(cache.registry().lookup("Author"), Some(Author::model_tag().as_str()));
    }
}
