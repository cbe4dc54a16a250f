//! Cache configuration

use serde::{Deserialize, Serialize};

use crate::ttl::ExpireAfter;

/// Environment variable toggling caching globally.
pub const ENABLED_ENV: &str = "MODEL_CACHE_ENABLED";

/// Environment variable naming the default [`ExpireAfter`].
pub const TTL_ENV: &str = "MODEL_CACHE_TTL";

/// Process-wide cache configuration.
///
/// Passed once into [`crate::ModelCacheBuilder`]; the façade never reads
/// ambient state after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When false every `remember*` call runs its compute unit directly and
    /// never reads from or writes to the store.
    pub enabled: bool,
    /// Lifetime applied when a `remember*` call does not specify one.
    pub default_ttl: ExpireAfter,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl: ExpireAfter::Forever,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// A configuration with caching switched off.
    pub fn disabled() -> Self {
        Self::default().with_enabled(false)
    }

    /// Enable or disable caching.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the default lifetime.
    pub fn with_default_ttl(mut self, ttl: ExpireAfter) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Load configuration from `MODEL_CACHE_ENABLED` and `MODEL_CACHE_TTL`.
    ///
    /// Unset variables keep their defaults. Unparseable values are logged and
    /// ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`CacheConfig::from_env`] but reads through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENABLED_ENV) {
            match parse_bool(&raw) {
                Some(enabled) => config.enabled = enabled,
                None => tracing::warn!(
                    variable = ENABLED_ENV,
                    value = %raw,
                    "ignoring unparseable cache toggle"
                ),
            }
        }

        if let Some(raw) = lookup(TTL_ENV) {
            match raw.parse::<ExpireAfter>() {
                Ok(ttl) => config.default_ttl = ttl,
                Err(e) => tracing::warn!(variable = TTL_ENV, error = %e, "ignoring default ttl"),
            }
        }

        config
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
