use async_trait::async_trait;

use crate::entry::{StorageMode, StoredEntry};
use crate::error::CacheError;
use crate::tags::TagSet;

/// A store is a common interface for reading, writing and flushing cache entries
/// by flat key.
///
/// Stores are type-agnostic and work with `StoredEntry` which can hold either
/// typed values (for in-memory stores) or serialized JSON (for remote stores).
///
/// The store implementation is responsible for honouring `StoredEntry::expires_at`
/// and must never hand out an expired entry.
#[async_trait]
pub trait Store: Send + Sync {
    /// A name for metrics/tracing.
    ///
    /// # Example
    /// - "hashmap"
    /// - "moka"
    /// - "redis"
    fn name(&self) -> &'static str;

    /// Returns the storage mode preference for this store.
    ///
    /// Default implementation returns `Serialized` for safety.
    fn storage_mode(&self) -> StorageMode {
        StorageMode::Serialized
    }

    /// Capability query: the tag-indexed view of this store, if it has one.
    ///
    /// Stores that return `None` are flushed wholesale on every invalidation.
    fn tagged(&self) -> Option<&dyn TaggableStore> {
        None
    }

    /// Whether [`Store::tagged`] returns a view.
    fn supports_tags(&self) -> bool {
        self.tagged().is_some()
    }

    /// Return the cached entry.
    ///
    /// The response must be `None` for cache misses and expired entries.
    async fn get(&self, key: &str) -> Result<Option<StoredEntry>, CacheError>;

    /// Store the entry under `key`, replacing any previous value.
    async fn put(&self, key: &str, entry: StoredEntry) -> Result<(), CacheError>;

    /// Remove every entry this store owns.
    async fn flush(&self) -> Result<(), CacheError>;
}

/// A store that can associate entries with tags and flush by tag.
#[async_trait]
pub trait TaggableStore: Store {
    /// Store the entry under `key` and record its membership in every tag of `tags`.
    async fn put_tagged(
        &self,
        tags: &TagSet,
        key: &str,
        entry: StoredEntry,
    ) -> Result<(), CacheError>;

    /// Remove every entry associated with at least one tag of `tags`.
    ///
    /// Entries tagged only with other tags are left untouched.
    async fn flush_tags(&self, tags: &TagSet) -> Result<(), CacheError>;
}
