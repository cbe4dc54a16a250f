//! Tag inputs and their canonical form.

use std::any::type_name;
use std::collections::{BTreeSet, HashMap};

use crate::key::with_prefix;
use crate::model::{Cachable, Flushable};

/// Canonical tags attached to a cache entry. Set semantics, stable order.
pub type TagSet = BTreeSet<String>;

/// A tag as passed to a `remember*` call.
///
/// Model and instance tags let one entity's cache depend on another entity's
/// lifecycle: an entry tagged with `Tag::model::<Author>()` is flushed whenever
/// any author changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    /// An arbitrary grouping; prefixed with the caller's model prefix unless it
    /// names a registered model type.
    Plain(String),
    /// Every instance of a model type.
    Model {
        type_name: &'static str,
        tag: String,
    },
    /// One entity instance.
    Instance(String),
}

impl Tag {
    pub fn model<T: Cachable>() -> Self {
        Tag::Model {
            type_name: type_name::<T>(),
            tag: T::model_tag(),
        }
    }

    pub fn instance(entity: &dyn Flushable) -> Self {
        Tag::Instance(entity.instance_tag())
    }
}

impl From<&str> for Tag {
    fn from(tag: &str) -> Self {
        Tag::Plain(tag.to_string())
    }
}

impl From<String> for Tag {
    fn from(tag: String) -> Self {
        Tag::Plain(tag)
    }
}

/// Model types known to a cache, looked up by name when resolving plain tags.
///
/// Each type is reachable by its full Rust path, its bare type name and its
/// [`Cachable::model_name`]. When two types share a bare name the first one
/// registered keeps it; full paths always resolve.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    tags: HashMap<String, String>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `T` resolvable from plain tag strings.
    pub fn register<T: Cachable>(&mut self) {
        let full = type_name::<T>();
        let tag = T::model_tag();
        let bare = full
            .split('<')
            .next()
            .and_then(|base| base.rsplit("::").next())
            .unwrap_or(full);

        self.tags.insert(full.to_string(), tag.clone());
        self.tags
            .entry(bare.to_string())
            .or_insert_with(|| tag.clone());
        self.tags.entry(T::model_name()).or_insert(tag);
    }

    /// Type tag of the model registered under `name`.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }

    /// Number of names (not types) the registry answers to.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Canonical form of a single tag input.
    pub fn resolve_one(&self, tag: &Tag, prefix: &str) -> String {
        match tag {
            Tag::Plain(name) => match self.lookup(name) {
                Some(model_tag) => model_tag.to_string(),
                None => with_prefix(prefix, name),
            },
            Tag::Model { tag, .. } => tag.clone(),
            Tag::Instance(tag) => tag.clone(),
        }
    }

    /// Full tag set of an entry: the scope's own tag, the model's default tags
    /// and the caller's tags.
    pub fn resolve(&self, own_tag: &str, defaults: &[String], raw: &[Tag], prefix: &str) -> TagSet {
        let mut tags = TagSet::new();
        tags.insert(own_tag.to_string());

        for name in defaults {
            tags.insert(self.resolve_one(&Tag::Plain(name.clone()), prefix));
        }
        for tag in raw {
            tags.insert(self.resolve_one(tag, prefix));
        }

        tags
    }
}
