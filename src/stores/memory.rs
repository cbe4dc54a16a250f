use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::entry::{StorageMode, StoredEntry};
use crate::error::CacheError;
use crate::store::{Store, TaggableStore};
use crate::tags::TagSet;
use crate::utils::{now_ms, rand_simple};

/// Configuration for eviction on set operations.
#[derive(Debug, Clone)]
pub struct EvictOnSetConfig {
    /// Provide a number between 0 and 1 to calculate whether eviction should run on each set.
    ///
    /// - `1.0` -> run eviction on every `set`
    /// - `0.5` -> run eviction on every 2nd `set` (on average)
    /// - `0.0` -> disable eviction
    pub frequency: f64,

    /// Remove items until the number of items in the map is lower than `max_items`.
    pub max_items: usize,
}

/// Configuration for HashMapStore.
#[derive(Debug, Clone)]
pub struct HashMapStoreConfig {
    /// Remove expired entries on every `set` operation.
    pub evict_on_set: Option<EvictOnSetConfig>,

    /// Expose the tag-indexed capability. When false the store behaves like a
    /// plain key/value backend and every invalidation flushes it entirely.
    pub taggable: bool,
}

impl Default for HashMapStoreConfig {
    fn default() -> Self {
        HashMapStoreConfig {
            evict_on_set: None,
            taggable: true,
        }
    }
}

impl HashMapStoreConfig {
    /// A plain, untaggable configuration.
    pub fn untagged() -> Self {
        HashMapStoreConfig {
            taggable: false,
            ..Default::default()
        }
    }
}

/// Internal stored entry with its tags.
#[derive(Clone)]
struct Slot {
    entry: StoredEntry,
    tags: TagSet,
}

/// Thread-safe in-memory cache store using HashMap with RwLock.
///
/// This is a simple store suitable for:
/// - Low to moderate concurrency (<8 threads)
/// - Small to medium cache sizes (<1000 items)
/// - Tests and single-process deployments that need tag-scoped flushes
///
/// For high-concurrency scenarios, consider using `MokaStore` instead.
pub struct HashMapStore {
    state: RwLock<HashMap<String, Slot>>,
    evict_on_set: Option<EvictOnSetConfig>,
    taggable: bool,
}

impl HashMapStore {
    /// Create a new HashMapStore with the given configuration.
    pub fn new(config: HashMapStoreConfig) -> Self {
        HashMapStore {
            state: RwLock::new(HashMap::new()),
            evict_on_set: config.evict_on_set,
            taggable: config.taggable,
        }
    }

    /// Number of entries currently held, including expired ones not yet evicted.
    pub async fn len(&self) -> usize {
        self.state.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.is_empty()
    }

    /// Keys currently held, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.state.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Tags recorded for `key`, if present.
    pub async fn tags_of(&self, key: &str) -> Option<TagSet> {
        self.state.read().await.get(key).map(|slot| slot.tags.clone())
    }

    async fn insert(&self, key: &str, entry: StoredEntry, tags: TagSet) {
        {
            let mut state = self.state.write().await;
            state.insert(key.to_string(), Slot { entry, tags });
        }

        self.maybe_evict().await;
    }

    /// Run eviction if configured and random check passes.
    async fn maybe_evict(&self) {
        let Some(ref config) = self.evict_on_set else {
            return;
        };

        // Check frequency
        if config.frequency <= 0.0 {
            return;
        }

        let should_evict = if config.frequency >= 1.0 {
            true
        } else {
            rand_simple() < config.frequency
        };

        if !should_evict {
            return;
        }

        let mut state = self.state.write().await;
        let now = now_ms();

        // First delete all expired entries
        state.retain(|_, slot| !slot.entry.is_expired(now));

        // If still over max_items, remove the entries closest to expiry;
        // entries without expiry go last
        if state.len() > config.max_items {
            let mut entries: Vec<_> = state
                .iter()
                .map(|(k, slot)| (k.clone(), slot.entry.expires_at().unwrap_or(i64::MAX)))
                .collect();
            entries.sort_by_key(|(_, expires)| *expires);

            let to_remove = state.len() - config.max_items;
            for (key, _) in entries.into_iter().take(to_remove) {
                state.remove(&key);
            }
        }
    }
}

#[async_trait]
impl Store for HashMapStore {
    fn name(&self) -> &'static str {
        "hashmap"
    }

    fn storage_mode(&self) -> StorageMode {
        StorageMode::Typed
    }

    fn tagged(&self) -> Option<&dyn TaggableStore> {
        if self.taggable { Some(self) } else { None }
    }

    async fn get(&self, key: &str) -> Result<Option<StoredEntry>, CacheError> {
        let state = self.state.read().await;

        let Some(slot) = state.get(key) else {
            return Ok(None);
        };

        if slot.entry.is_expired(now_ms()) {
            // Entry is expired, remove it
            drop(state);
            let mut state = self.state.write().await;
            state.remove(key);
            return Ok(None);
        }

        Ok(Some(slot.entry.clone()))
    }

    async fn put(&self, key: &str, entry: StoredEntry) -> Result<(), CacheError> {
        self.insert(key, entry, TagSet::new()).await;
        Ok(())
    }

    async fn flush(&self) -> Result<(), CacheError> {
        self.state.write().await.clear();
        Ok(())
    }
}

#[async_trait]
impl TaggableStore for HashMapStore {
    async fn put_tagged(
        &self,
        tags: &TagSet,
        key: &str,
        entry: StoredEntry,
    ) -> Result<(), CacheError> {
        self.insert(key, entry, tags.clone()).await;
        Ok(())
    }

    async fn flush_tags(&self, tags: &TagSet) -> Result<(), CacheError> {
        let mut state = self.state.write().await;
        state.retain(|_, slot| slot.tags.is_disjoint(tags));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(names: &[&str]) -> TagSet {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn test_get_put_flush() {
        let store = HashMapStore::new(HashMapStoreConfig::default());

        // Initially empty
        let result = store.get("key1").await.unwrap();
        assert!(result.is_none());

        let entry = StoredEntry::from_typed("value1".to_string(), Some(now_ms() + 60_000));
        store.put("key1", entry).await.unwrap();

        let result = store.get("key1").await.unwrap();
        let value = result.unwrap().into_typed::<String>().unwrap().value;
        assert_eq!(value, "value1");

        store.flush().await.unwrap();
        assert!(store.get("key1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_removed() {
        let store = HashMapStore::new(HashMapStoreConfig::default());

        let entry = StoredEntry::from_typed("value1".to_string(), Some(now_ms() - 500));
        store.put("expired", entry).await.unwrap();

        assert!(store.get("expired").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_forever_entry_kept() {
        let store = HashMapStore::new(HashMapStoreConfig::default());

        store
            .put("forever", StoredEntry::from_typed(1u8, None))
            .await
            .unwrap();

        let entry = store.get("forever").await.unwrap().unwrap();
        assert_eq!(entry.expires_at(), None);
    }

    #[tokio::test]
    async fn test_flush_tags_only_touches_intersecting_entries() {
        let store = HashMapStore::new(HashMapStoreConfig::default());
        let tagged = store.tagged().unwrap();

        tagged
            .put_tagged(&tags(&["post"]), "a", StoredEntry::from_typed(1u8, None))
            .await
            .unwrap();
        tagged
            .put_tagged(&tags(&["post:1", "author"]), "b", StoredEntry::from_typed(2u8, None))
            .await
            .unwrap();
        tagged
            .put_tagged(&tags(&["author"]), "c", StoredEntry::from_typed(3u8, None))
            .await
            .unwrap();

        tagged.flush_tags(&tags(&["post", "post:1"])).await.unwrap();

        assert!(store.get("a").await.unwrap().is_none());
        assert!(store.get("b").await.unwrap().is_none());
        assert!(store.get("c").await.unwrap().is_some());
        assert_eq!(store.tags_of("c").await, Some(tags(&["author"])));
    }

    #[tokio::test]
    async fn test_untagged_config_hides_capability() {
        let store = HashMapStore::new(HashMapStoreConfig::untagged());
        assert!(store.tagged().is_none());
        assert!(!store.supports_tags());
    }

    #[tokio::test]
    async fn test_evict_on_set_caps_size() {
        let store = HashMapStore::new(HashMapStoreConfig {
            evict_on_set: Some(EvictOnSetConfig {
                frequency: 1.0,
                max_items: 2,
            }),
            taggable: true,
        });
        let now = now_ms();

        store
            .put("soon", StoredEntry::from_typed(1u8, Some(now + 1_000)))
            .await
            .unwrap();
        store
            .put("later", StoredEntry::from_typed(2u8, Some(now + 60_000)))
            .await
            .unwrap();
        store
            .put("never", StoredEntry::from_typed(3u8, None))
            .await
            .unwrap();

        assert_eq!(store.len().await, 2);
        assert!(store.get("soon").await.unwrap().is_none());
        assert!(store.get("never").await.unwrap().is_some());
    }
}
