//! The memoizing façade.
//!
//! Every `remember*` call resolves the compute unit's identity, builds the key
//! and the tag set, then does a single get-or-compute against the store:
//!
//! ```ignore
//! let cache = ModelCacheBuilder::new(store).register::<Post>().build();
//!
//! let published = ComputeUnit::closure(move || db.count_published());
//! let count = cache
//!     .remember::<Post, _>(&published, RememberOptions::new().tag(Tag::model::<Author>()))
//!     .await?;
//! ```
//!
//! Type-scoped entries are flushed when any instance of the type changes,
//! instance-scoped ones only when that instance does. Concurrent misses on the
//! same key may both compute; the last write wins.

use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;

use crate::compute::ComputeUnit;
use crate::config::CacheConfig;
use crate::entry::StoredEntry;
use crate::error::CacheError;
use crate::invalidation::{self, FlushOutcome, InvalidationObserver};
use crate::key::{KeyPrefix, build_key, with_prefix};
use crate::model::{Cachable, Flushable, Permissable, permissions_marker};
use crate::store::Store;
use crate::tags::{ModelRegistry, Tag, TagSet};
use crate::ttl::Ttl;
use crate::utils::now_ms;

/// Values that can be memoized.
pub trait CacheValue: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> CacheValue for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Per-call options of the `remember*` family.
#[derive(Debug, Clone, Default)]
pub struct RememberOptions {
    pub tags: Vec<Tag>,
    pub prefix: KeyPrefix,
    /// Falls back to [`CacheConfig::default_ttl`] when unset.
    pub ttl: Option<Ttl>,
}

impl RememberOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(mut self, tag: impl Into<Tag>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn prefix(mut self, prefix: impl Into<KeyPrefix>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn ttl(mut self, ttl: impl Into<Ttl>) -> Self {
        self.ttl = Some(ttl.into());
        self
    }
}

/// Where an entry lives and what flushes it.
struct Scope {
    /// Type tag or instance tag; also the leading key segment.
    own_tag: String,
    cache_prefix: String,
    default_tags: Vec<String>,
}

impl Scope {
    fn of_type<T: Cachable>() -> Self {
        Scope {
            own_tag: T::model_tag(),
            cache_prefix: T::cache_prefix(),
            default_tags: T::default_tags(),
        }
    }

    fn of_instance<T: Cachable>(entity: &T) -> Self {
        Scope {
            own_tag: entity.instance_tag(),
            cache_prefix: T::cache_prefix(),
            default_tags: T::default_tags(),
        }
    }
}

/// Lifetime chosen by the entry point.
#[derive(Clone, Copy)]
enum Lifetime {
    Configured,
    Forever,
}

/// Memoizing cache bound to one store.
///
/// Cheap to clone; clones share the store and the model registry.
#[derive(Clone)]
pub struct ModelCache {
    store: Arc<dyn Store>,
    config: CacheConfig,
    registry: Arc<ModelRegistry>,
}

impl ModelCache {
    pub fn new(store: Arc<dyn Store>, config: CacheConfig, registry: ModelRegistry) -> Self {
        ModelCache {
            store,
            config,
            registry: Arc::new(registry),
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Cache `unit` for type `T`; any change to any `T` invalidates it.
    pub async fn remember<T, V>(
        &self,
        unit: &ComputeUnit<V>,
        options: RememberOptions,
    ) -> Result<V, CacheError>
    where
        T: Cachable,
        V: CacheValue,
    {
        self.remember_scoped(Scope::of_type::<T>(), unit, options, None, Lifetime::Configured)
            .await
    }

    /// [`ModelCache::remember`] without expiry.
    pub async fn remember_forever<T, V>(
        &self,
        unit: &ComputeUnit<V>,
        options: RememberOptions,
    ) -> Result<V, CacheError>
    where
        T: Cachable,
        V: CacheValue,
    {
        self.remember_scoped(Scope::of_type::<T>(), unit, options, None, Lifetime::Forever)
            .await
    }

    /// [`ModelCache::remember`] partitioned by the principal's permissions.
    pub async fn remember_with_permissions<T, V>(
        &self,
        principal: Option<&dyn Permissable>,
        unit: &ComputeUnit<V>,
        options: RememberOptions,
    ) -> Result<V, CacheError>
    where
        T: Cachable,
        V: CacheValue,
    {
        let marker = Some(permissions_marker(principal));
        self.remember_scoped(Scope::of_type::<T>(), unit, options, marker, Lifetime::Configured)
            .await
    }

    pub async fn remember_with_permissions_forever<T, V>(
        &self,
        principal: Option<&dyn Permissable>,
        unit: &ComputeUnit<V>,
        options: RememberOptions,
    ) -> Result<V, CacheError>
    where
        T: Cachable,
        V: CacheValue,
    {
        let marker = Some(permissions_marker(principal));
        self.remember_scoped(Scope::of_type::<T>(), unit, options, marker, Lifetime::Forever)
            .await
    }

    /// Cache `unit` for one entity; only changes to `entity` invalidate it.
    pub async fn remember_on_instance<T, V>(
        &self,
        entity: &T,
        unit: &ComputeUnit<V>,
        options: RememberOptions,
    ) -> Result<V, CacheError>
    where
        T: Cachable,
        V: CacheValue,
    {
        let scope = Scope::of_instance(entity);
        self.remember_scoped(scope, unit, options, None, Lifetime::Configured)
            .await
    }

    pub async fn remember_on_instance_forever<T, V>(
        &self,
        entity: &T,
        unit: &ComputeUnit<V>,
        options: RememberOptions,
    ) -> Result<V, CacheError>
    where
        T: Cachable,
        V: CacheValue,
    {
        let scope = Scope::of_instance(entity);
        self.remember_scoped(scope, unit, options, None, Lifetime::Forever)
            .await
    }

    pub async fn remember_on_instance_with_permissions<T, V>(
        &self,
        entity: &T,
        principal: Option<&dyn Permissable>,
        unit: &ComputeUnit<V>,
        options: RememberOptions,
    ) -> Result<V, CacheError>
    where
        T: Cachable,
        V: CacheValue,
    {
        let scope = Scope::of_instance(entity);
        let marker = Some(permissions_marker(principal));
        self.remember_scoped(scope, unit, options, marker, Lifetime::Configured)
            .await
    }

    pub async fn remember_on_instance_with_permissions_forever<T, V>(
        &self,
        entity: &T,
        principal: Option<&dyn Permissable>,
        unit: &ComputeUnit<V>,
        options: RememberOptions,
    ) -> Result<V, CacheError>
    where
        T: Cachable,
        V: CacheValue,
    {
        let scope = Scope::of_instance(entity);
        let marker = Some(permissions_marker(principal));
        self.remember_scoped(scope, unit, options, marker, Lifetime::Forever)
            .await
    }

    /// Flush the entries of `entity`'s type and of the instance itself.
    ///
    /// Runs regardless of [`CacheConfig::enabled`].
    pub async fn flush_model_cache(&self, entity: &dyn Flushable) -> Result<FlushOutcome, CacheError> {
        invalidation::flush_entity(self.store.as_ref(), entity).await
    }

    /// Flush the whole store.
    pub async fn flush_all(&self) -> Result<(), CacheError> {
        self.store.flush().await
    }

    /// Lifecycle observer to hand to entity stores.
    pub fn observer(&self) -> InvalidationObserver {
        InvalidationObserver::new(self.store.clone())
    }

    async fn remember_scoped<V: CacheValue>(
        &self,
        scope: Scope,
        unit: &ComputeUnit<V>,
        options: RememberOptions,
        permissions: Option<String>,
        lifetime: Lifetime,
    ) -> Result<V, CacheError> {
        if !self.config.enabled {
            return Ok(unit.invoke());
        }

        let identity = unit.identity()?;
        let mut key = with_prefix(
            &scope.cache_prefix,
            &build_key(&scope.own_tag, &options.prefix.resolve(), &identity),
        );
        if let Some(marker) = permissions {
            key = format!("{key}-{marker}");
        }

        let tags = self.registry.resolve(
            &scope.own_tag,
            &scope.default_tags,
            &options.tags,
            &scope.cache_prefix,
        );

        let ttl = match lifetime {
            Lifetime::Forever => Ttl::FOREVER,
            Lifetime::Configured => options.ttl.unwrap_or(Ttl::After(self.config.default_ttl)),
        };

        self.get_or_compute(&key, &tags, ttl, unit).await
    }

    async fn get_or_compute<V: CacheValue>(
        &self,
        key: &str,
        tags: &TagSet,
        ttl: Ttl,
        unit: &ComputeUnit<V>,
    ) -> Result<V, CacheError> {
        if let Some(stored) = self.store.get(key).await? {
            if !stored.is_expired(now_ms()) {
                tracing::debug!(key, store = self.store.name(), "cache hit");
                return Ok(stored.into_typed::<V>()?.value);
            }
        }

        tracing::debug!(key, store = self.store.name(), "cache miss");
        let value = unit.invoke();

        if ttl.is_immediate() {
            return Ok(value);
        }

        let entry = StoredEntry::from_typed_with_serializer(value.clone(), ttl.expires_at(now_ms()))
            .convert_for_mode(self.store.storage_mode())?;

        match self.store.tagged() {
            Some(tagged) => tagged.put_tagged(tags, key, entry).await?,
            None => self.store.put(key, entry).await?,
        }

        Ok(value)
    }
}
