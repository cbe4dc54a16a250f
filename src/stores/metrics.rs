//! Metrics middleware for cache stores.
//!
//! This module provides a `MetricsStore` wrapper that emits metrics for all
//! backend operations (reads, writes, flushes) to a user-provided sink.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use model_cache::{HashMapStore, HashMapStoreConfig, ModelCacheBuilder, Store};
//! use model_cache::{CacheMetric, MetricsSink, MetricsStore};
//!
//! // Create metrics sink
//! let sink = Arc::new(MyMetricsSink::new());
//!
//! // Wrap store with metrics
//! let memory = Arc::new(HashMapStore::new(HashMapStoreConfig::default()));
//! let store: Arc<dyn Store> = Arc::new(MetricsStore::new(memory, sink.clone()));
//!
//! // Use in the cache - metrics emitted automatically
//! let cache = ModelCacheBuilder::new(store).build();
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use crate::entry::{StorageMode, StoredEntry};
use crate::error::CacheError;
use crate::store::{Store, TaggableStore};
use crate::tags::TagSet;

/// What a flush targeted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushScope {
    /// Everything the store holds.
    All,
    /// Entries carrying any of these tags.
    Tags(TagSet),
}

/// Metrics emitted by the MetricsStore wrapper.
#[derive(Debug, Clone)]
pub enum CacheMetric {
    /// Emitted on every cache read (get) operation.
    Read {
        /// The cache key that was read.
        key: String,
        /// Whether the key was found in the cache.
        hit: bool,
        /// Latency of the operation in milliseconds.
        latency_ms: f64,
        /// Name of the store tier (from Store::name()).
        tier: String,
    },
    /// Emitted on every cache write (put / put_tagged) operation.
    Write {
        /// The cache key that was written.
        key: String,
        /// Number of tags attached; zero for untagged writes.
        tag_count: usize,
        /// Whether the written entry has an expiry.
        expires: bool,
        /// Latency of the operation in milliseconds.
        latency_ms: f64,
        /// Name of the store tier (from Store::name()).
        tier: String,
    },
    /// Emitted on every flush, full or tag-scoped.
    Flush {
        scope: FlushScope,
        /// Latency of the operation in milliseconds.
        latency_ms: f64,
        /// Name of the store tier (from Store::name()).
        tier: String,
    },
}

/// Trait for receiving cache metrics.
///
/// Implement this trait to collect metrics from `MetricsStore`.
///
/// # Example
///
/// ```ignore
/// use std::sync::Mutex;
/// use async_trait::async_trait;
/// use model_cache::{CacheMetric, MetricsSink};
///
/// struct BufferedSink {
///     buffer: Mutex<Vec<CacheMetric>>,
/// }
///
/// #[async_trait]
/// impl MetricsSink for BufferedSink {
///     fn emit(&self, metric: CacheMetric) {
///         self.buffer.lock().unwrap().push(metric);
///     }
///
///     async fn flush(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
///         // Send buffered metrics to your backend
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Emit a single metric.
    ///
    /// This is called synchronously in the hot path of cache operations.
    /// Implementations should be fast (e.g., buffer metrics in memory).
    fn emit(&self, metric: CacheMetric);

    /// Flush any buffered metrics.
    ///
    /// Called when the caller wants to ensure all metrics are persisted.
    /// This is typically called at shutdown or at periodic intervals.
    async fn flush(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// A store wrapper that emits metrics for all operations.
///
/// `MetricsStore` wraps any `Store` implementation and reports the same
/// capabilities as the store it wraps: it is taggable exactly when the inner
/// store is.
pub struct MetricsStore {
    inner: Arc<dyn Store>,
    sink: Arc<dyn MetricsSink>,
    tier_name: String,
}

impl MetricsStore {
    /// Create a new MetricsStore wrapping the given store.
    ///
    /// # Arguments
    /// * `inner` - The store to wrap
    /// * `sink` - The metrics sink to emit metrics to
    pub fn new(inner: Arc<dyn Store>, sink: Arc<dyn MetricsSink>) -> Self {
        let tier_name = inner.name().to_string();
        MetricsStore {
            inner,
            sink,
            tier_name,
        }
    }

    /// Get a reference to the metrics sink.
    pub fn sink(&self) -> &Arc<dyn MetricsSink> {
        &self.sink
    }

    fn elapsed_ms(start: Instant) -> f64 {
        start.elapsed().as_secs_f64() * 1000.0
    }

    fn emit_write(&self, key: &str, tag_count: usize, expires: bool, start: Instant) {
        self.sink.emit(CacheMetric::Write {
            key: key.to_string(),
            tag_count,
            expires,
            latency_ms: Self::elapsed_ms(start),
            tier: self.tier_name.clone(),
        });
    }

    fn emit_flush(&self, scope: FlushScope, start: Instant) {
        self.sink.emit(CacheMetric::Flush {
            scope,
            latency_ms: Self::elapsed_ms(start),
            tier: self.tier_name.clone(),
        });
    }
}

#[async_trait]
impl Store for MetricsStore {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn storage_mode(&self) -> StorageMode {
        self.inner.storage_mode()
    }

    fn tagged(&self) -> Option<&dyn TaggableStore> {
        match self.inner.tagged() {
            Some(_) => Some(self),
            None => None,
        }
    }

    async fn get(&self, key: &str) -> Result<Option<StoredEntry>, CacheError> {
        let start = Instant::now();
        let result = self.inner.get(key).await;
        let latency_ms = Self::elapsed_ms(start);

        self.sink.emit(CacheMetric::Read {
            key: key.to_string(),
            hit: matches!(result, Ok(Some(_))),
            latency_ms,
            tier: self.tier_name.clone(),
        });

        result
    }

    async fn put(&self, key: &str, entry: StoredEntry) -> Result<(), CacheError> {
        let start = Instant::now();
        let expires = entry.expires_at().is_some();
        let result = self.inner.put(key, entry).await;
        self.emit_write(key, 0, expires, start);
        result
    }

    async fn flush(&self) -> Result<(), CacheError> {
        let start = Instant::now();
        let result = self.inner.flush().await;
        self.emit_flush(FlushScope::All, start);
        result
    }
}

#[async_trait]
impl TaggableStore for MetricsStore {
    async fn put_tagged(
        &self,
        tags: &TagSet,
        key: &str,
        entry: StoredEntry,
    ) -> Result<(), CacheError> {
        let Some(inner) = self.inner.tagged() else {
            return Err(CacheError::backend(
                self.inner.name(),
                key,
                "store does not support tags",
            ));
        };

        let start = Instant::now();
        let expires = entry.expires_at().is_some();
        let result = inner.put_tagged(tags, key, entry).await;
        self.emit_write(key, tags.len(), expires, start);
        result
    }

    async fn flush_tags(&self, tags: &TagSet) -> Result<(), CacheError> {
        let Some(inner) = self.inner.tagged() else {
            return Err(CacheError::backend(
                self.inner.name(),
                "",
                "store does not support tags",
            ));
        };

        let start = Instant::now();
        let result = inner.flush_tags(tags).await;
        self.emit_flush(FlushScope::Tags(tags.clone()), start);
        result
    }
}
