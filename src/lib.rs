//! model-cache - Tagged memoization for entity-derived values
//!
//! This library caches the results of zero-argument computations against the
//! entities they depend on:
//! - Cache keys derived from where a computation is defined
//! - Type-scoped and instance-scoped entries, optionally per permission set
//! - Tag-indexed invalidation on entity save / delete / restore
//! - Whole-store flush fallback for backends without tag support
//!
//! # Example
//!
//! ```ignore
//! use model_cache::{
//!     Cachable, ComputeUnit, HashMapStore, HashMapStoreConfig, ModelCacheBuilder,
//!     RememberOptions, Tag,
//! };
//! use std::sync::Arc;
//!
//! struct Post { id: u64 }
//!
//! impl Cachable for Post {
//!     fn cache_id(&self) -> String {
//!         self.id.to_string()
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), model_cache::CacheError> {
//!     let memory = Arc::new(HashMapStore::new(HashMapStoreConfig::default()));
//!     let cache = ModelCacheBuilder::new(memory).register::<Post>().build();
//!
//!     // Reuse the unit to hit the same entry
//!     let trending = ComputeUnit::closure(|| vec![1u64, 2, 3]);
//!     let ids = cache
//!         .remember::<Post, _>(&trending, RememberOptions::new().tag("home"))
//!         .await?;
//!
//!     // Any post changing flushes it
//!     cache.flush_model_cache(&Post { id: 1 }).await?;
//!     Ok(())
//! }
//! ```

mod builder;
pub mod compute;
mod config;
mod entry;
mod error;
pub mod invalidation;
pub mod key;
mod memo;
pub mod model;
mod store;
pub mod stores;
pub mod tags;
pub mod ttl;
mod utils;

// Re-export public API
pub use builder::ModelCacheBuilder;
pub use compute::{ComputeUnit, Dispatch, Invokable};
pub use config::{CacheConfig, ENABLED_ENV, TTL_ENV};
pub use entry::{Entry, StorageMode, StoredEntry};
pub use error::CacheError;
pub use invalidation::{FlushOutcome, InvalidationObserver, LifecycleEvent, LifecycleObserver};
pub use key::{KeyPrefix, SEPARATOR, build_key, with_prefix};
pub use memo::{CacheValue, ModelCache, RememberOptions};
pub use model::{Cachable, Flushable, GUEST_PERMISSIONS_KEY, Permissable, permissions_marker};
pub use store::{Store, TaggableStore};
pub use stores::memory::{EvictOnSetConfig, HashMapStore, HashMapStoreConfig};
pub use stores::metrics::{CacheMetric, FlushScope, MetricsSink, MetricsStore};
pub use stores::moka::{MokaStore, MokaStoreConfig};
pub use stores::redis::{RedisStore, RedisStoreConfig};
pub use tags::{ModelRegistry, Tag, TagSet};
pub use ttl::{ExpireAfter, ParseExpireAfterError, Ttl};
