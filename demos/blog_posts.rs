//! A small blog whose expensive queries are memoized per post and per author.
//!
//! Run with: cargo run --example blog_posts

use model_cache::{
    Cachable, CacheConfig, CacheError, ComputeUnit, ExpireAfter, HashMapStore,
    HashMapStoreConfig, KeyPrefix, LifecycleObserver, ModelCacheBuilder, Permissable,
    RememberOptions, Tag,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Post {
    id: u64,
    author_id: u64,
    title: String,
}

impl Cachable for Post {
    fn cache_id(&self) -> String {
        self.id.to_string()
    }

    fn cache_prefix() -> String {
        "blog".to_string()
    }

    fn default_tags() -> Vec<String> {
        vec!["front_page".to_string()]
    }
}

#[derive(Clone, Debug)]
struct Author {
    id: u64,
}

impl Cachable for Author {
    fn cache_id(&self) -> String {
        self.id.to_string()
    }

    fn cache_prefix() -> String {
        "blog".to_string()
    }
}

struct Editor;

impl Permissable for Editor {
    fn permissions_key(&self) -> String {
        "editor".to_string()
    }
}

#[tokio::main]
async fn main() -> Result<(), CacheError> {
    let store = Arc::new(HashMapStore::new(HashMapStoreConfig::default()));
    let cache = ModelCacheBuilder::new(store.clone())
        .config(CacheConfig::from_env().with_default_ttl(ExpireAfter::OneHour))
        .register::<Post>()
        .register::<Author>()
        .build();
    let observer = cache.observer();

    let queries = Arc::new(AtomicUsize::new(0));

    // Type-scoped: flushed when any post or, through the tag, any author changes
    let counter = queries.clone();
    let front_page = ComputeUnit::closure(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        vec![
            Post { id: 1, author_id: 7, title: "Hello".to_string() },
            Post { id: 2, author_id: 7, title: "Again".to_string() },
        ]
    });
    let options = || RememberOptions::new().tag(Tag::model::<Author>());

    let posts = cache.remember::<Post, _>(&front_page, options()).await?;
    cache.remember::<Post, _>(&front_page, options()).await?;
    println!("front page: {} posts, {} queries", posts.len(), queries.load(Ordering::SeqCst));

    // Instance-scoped with a per-request prefix
    let counter = queries.clone();
    let word_count = ComputeUnit::closure(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        42u32
    });
    let locale = KeyPrefix::dynamic(|| "en".to_string());
    let first = posts[0].clone();
    let second = posts[1].clone();
    for post in [&first, &second, &first] {
        cache
            .remember_on_instance(post, &word_count, RememberOptions::new().prefix(locale.clone()))
            .await?;
    }
    println!("word counts cached, {} queries", queries.load(Ordering::SeqCst));

    // Editors and guests see different drafts
    let counter = queries.clone();
    let drafts = ComputeUnit::closure(move || counter.fetch_add(1, Ordering::SeqCst) as u32);
    cache
        .remember_with_permissions_forever::<Post, _>(Some(&Editor), &drafts, RememberOptions::new())
        .await?;
    cache
        .remember_with_permissions_forever::<Post, _>(None, &drafts, RememberOptions::new())
        .await?;
    println!("drafts cached per role, {} queries", queries.load(Ordering::SeqCst));

    // Editing the first post flushes the front page and its own word count only
    observer.saved(&first).await?;
    println!("after saving post {}: {} entries left", first.id, store.len().await);

    // Any author change flushes the front page through its model tag
    observer.saved(&Author { id: posts[0].author_id }).await?;
    cache.remember::<Post, _>(&front_page, options()).await?;
    println!("after saving author: {} queries", queries.load(Ordering::SeqCst));

    Ok(())
}
