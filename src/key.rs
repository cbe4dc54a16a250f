//! Cache key assembly.
//!
//! Keys have the form `[entity_prefix:][caller_prefix:]identity`, empty
//! segments dropped together with their separator.

use std::fmt;
use std::sync::Arc;

use crate::compute::Invokable;

/// Separator between key and tag segments.
pub const SEPARATOR: char = ':';

/// Caller-supplied key segment.
///
/// Dynamic prefixes are evaluated on every call and never memoized, so they
/// can carry time- or context-dependent parts.
#[derive(Clone, Default)]
pub enum KeyPrefix {
    #[default]
    None,
    Static(String),
    Dynamic(Arc<dyn Fn() -> String + Send + Sync>),
}

impl KeyPrefix {
    /// A prefix recomputed on every call.
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        KeyPrefix::Dynamic(Arc::new(f))
    }

    /// A prefix produced by invoking a fresh `I::default()` on every call.
    pub fn invokable<I>() -> Self
    where
        I: Invokable<String> + Default,
    {
        KeyPrefix::Dynamic(Arc::new(|| I::default().invoke()))
    }

    /// The segment for this call.
    pub fn resolve(&self) -> String {
        match self {
            KeyPrefix::None => String::new(),
            KeyPrefix::Static(prefix) => prefix.clone(),
            KeyPrefix::Dynamic(f) => f(),
        }
    }
}

impl fmt::Debug for KeyPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPrefix::None => f.write_str("None"),
            KeyPrefix::Static(prefix) => f.debug_tuple("Static").field(prefix).finish(),
            KeyPrefix::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl From<&str> for KeyPrefix {
    fn from(prefix: &str) -> Self {
        KeyPrefix::Static(prefix.to_string())
    }
}

impl From<String> for KeyPrefix {
    fn from(prefix: String) -> Self {
        KeyPrefix::Static(prefix)
    }
}

/// Join non-empty segments with [`SEPARATOR`].
pub fn build_key(entity_prefix: &str, caller_prefix: &str, identity: &str) -> String {
    [entity_prefix, caller_prefix, identity]
        .into_iter()
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(":")
}

/// Prepend `prefix` unless `value` already carries it.
///
/// Idempotent: `with_prefix(p, &with_prefix(p, v)) == with_prefix(p, v)`.
pub fn with_prefix(prefix: &str, value: &str) -> String {
    if prefix.is_empty()
        || value == prefix
        || value
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with(SEPARATOR))
    {
        return value.to_string();
    }

    if value.is_empty() {
        return prefix.to_string();
    }

    format!("{prefix}{SEPARATOR}{value}")
}
