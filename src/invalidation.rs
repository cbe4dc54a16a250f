//! Flushing cached values when entities change.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::error::CacheError;
use crate::model::Flushable;
use crate::store::Store;
use crate::tags::TagSet;

/// Entity lifecycle notifications that invalidate cached values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    Saved,
    Deleted,
    /// A soft delete was undone.
    Restored,
}

impl LifecycleEvent {
    pub const ALL: [LifecycleEvent; 3] = [
        LifecycleEvent::Saved,
        LifecycleEvent::Deleted,
        LifecycleEvent::Restored,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            LifecycleEvent::Saved => "saved",
            LifecycleEvent::Deleted => "deleted",
            LifecycleEvent::Restored => "restored",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an invalidation did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The entity opted out of flushing.
    Skipped,
    /// Entries tagged with any of these tags were removed.
    Tags(TagSet),
    /// The store has no tag index and was flushed entirely.
    All,
}

/// Receiver of entity lifecycle notifications.
///
/// Entity stores hold a list of observers and call them after each change.
/// Only [`LifecycleObserver::notify`] has to be implemented.
#[async_trait]
pub trait LifecycleObserver: Send + Sync {
    async fn notify(&self, event: LifecycleEvent, entity: &dyn Flushable) -> Result<(), CacheError>;

    async fn saved(&self, entity: &dyn Flushable) -> Result<(), CacheError> {
        self.notify(LifecycleEvent::Saved, entity).await
    }

    async fn deleted(&self, entity: &dyn Flushable) -> Result<(), CacheError> {
        self.notify(LifecycleEvent::Deleted, entity).await
    }

    async fn restored(&self, entity: &dyn Flushable) -> Result<(), CacheError> {
        self.notify(LifecycleEvent::Restored, entity).await
    }
}

/// Observer that flushes the cache entries of every changed entity.
///
/// On a taggable store it removes the entries tagged with the entity's type
/// tag or instance tag. On any other store it flushes everything, trading hit
/// rate for never serving a stale value.
#[derive(Clone)]
pub struct InvalidationObserver {
    store: Arc<dyn Store>,
}

impl InvalidationObserver {
    pub fn new(store: Arc<dyn Store>) -> Self {
        InvalidationObserver { store }
    }

    /// Flush everything cached for `entity`.
    pub async fn flush_entity(&self, entity: &dyn Flushable) -> Result<FlushOutcome, CacheError> {
        flush_entity(self.store.as_ref(), entity).await
    }
}

#[async_trait]
impl LifecycleObserver for InvalidationObserver {
    async fn notify(&self, event: LifecycleEvent, entity: &dyn Flushable) -> Result<(), CacheError> {
        let outcome = self.flush_entity(entity).await?;
        tracing::debug!(%event, instance = %entity.instance_tag(), ?outcome, "entity changed");
        Ok(())
    }
}

pub(crate) async fn flush_entity(
    store: &dyn Store,
    entity: &dyn Flushable,
) -> Result<FlushOutcome, CacheError> {
    if entity.skip_flush() {
        tracing::debug!(instance = %entity.instance_tag(), "flush skipped by entity");
        return Ok(FlushOutcome::Skipped);
    }

    let Some(tagged) = store.tagged() else {
        tracing::warn!(
            store = store.name(),
            instance = %entity.instance_tag(),
            "store does not support tags, flushing all entries"
        );
        store.flush().await?;
        return Ok(FlushOutcome::All);
    };

    let tags: TagSet = [entity.type_tag(), entity.instance_tag()]
        .into_iter()
        .collect();
    tagged.flush_tags(&tags).await?;

    Ok(FlushOutcome::Tags(tags))
}
