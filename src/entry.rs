use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;

use crate::error::CacheError;

/// A cache entry containing a value and its expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry<V> {
    /// The cached value.
    pub value: V,

    /// Unix timestamp in milliseconds after which the entry must not be used.
    /// `None` means the entry never expires and only a flush removes it.
    pub expires_at: Option<i64>,
}

type Serializer = Arc<dyn Fn() -> Result<String, CacheError> + Send + Sync>;

/// Type-erased storage entry that supports both typed and serialized storage.
///
/// This enum allows stores to be type-agnostic while still supporting zero-copy
/// storage for in-memory stores (via `Typed`) and serialization for remote
/// stores (via `Serialized`).
#[derive(Clone)]
pub enum StoredEntry {
    /// For in-memory stores: zero-copy storage of typed values.
    ///
    /// The serializer converts the value to JSON when the entry has to be
    /// handed to a store that prefers `Serialized`.
    Typed {
        value: Arc<dyn Any + Send + Sync>,
        expires_at: Option<i64>,
        serializer: Option<Serializer>,
    },
    /// For remote stores: a JSON-encoded [`Entry`].
    Serialized {
        data: String,
        expires_at: Option<i64>,
    },
}

/// Storage mode preference for stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// Store prefers typed values (in-memory stores).
    Typed,
    /// Store prefers serialized values (remote stores).
    Serialized,
}

impl<V> Entry<V> {
    /// Create a new cache entry.
    pub fn new(value: V, expires_at: Option<i64>) -> Self {
        Entry { value, expires_at }
    }

    /// Check if the entry has expired and should not be used.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at.is_some_and(|at| now_ms >= at)
    }
}

impl std::fmt::Debug for StoredEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoredEntry::Typed { expires_at, .. } => f
                .debug_struct("Typed")
                .field("expires_at", expires_at)
                .finish_non_exhaustive(),
            StoredEntry::Serialized { data, expires_at } => f
                .debug_struct("Serialized")
                .field("data", data)
                .field("expires_at", expires_at)
                .finish(),
        }
    }
}

impl StoredEntry {
    /// Create a StoredEntry from a typed value without serialization support.
    pub fn from_typed<V>(value: V, expires_at: Option<i64>) -> Self
    where
        V: Send + Sync + 'static,
    {
        StoredEntry::Typed {
            value: Arc::new(value),
            expires_at,
            serializer: None,
        }
    }

    /// Create a StoredEntry from a typed value with serialization support.
    pub fn from_typed_with_serializer<V>(value: V, expires_at: Option<i64>) -> Self
    where
        V: Clone + Serialize + Send + Sync + 'static,
    {
        let value_arc = Arc::new(value);
        let value_for_serializer = value_arc.clone();

        let serializer: Serializer = Arc::new(move || {
            let entry = Entry::new(value_for_serializer.as_ref(), expires_at);
            serde_json::to_string(&entry).map_err(|e| {
                CacheError::backend("serialization", "", format!("Serialization failed: {}", e))
            })
        });

        StoredEntry::Typed {
            value: value_arc,
            expires_at,
            serializer: Some(serializer),
        }
    }

    /// Create a StoredEntry from serialized data (for remote stores).
    pub fn from_serialized(data: String, expires_at: Option<i64>) -> Self {
        StoredEntry::Serialized { data, expires_at }
    }

    /// Convert StoredEntry to a typed Entry<V>.
    ///
    /// - `Typed`: downcasts the Arc value to V and clones it
    /// - `Serialized`: deserializes the JSON string
    pub fn into_typed<V>(self) -> Result<Entry<V>, CacheError>
    where
        V: Clone + for<'de> Deserialize<'de> + Send + Sync + 'static,
    {
        match self {
            StoredEntry::Typed {
                value, expires_at, ..
            } => {
                let typed_arc = value.downcast::<V>().map_err(|_| {
                    CacheError::backend(
                        "serialization",
                        "",
                        format!("Type downcast to {} failed", std::any::type_name::<V>()),
                    )
                })?;

                Ok(Entry {
                    value: (*typed_arc).clone(),
                    expires_at,
                })
            }
            StoredEntry::Serialized { data, .. } => {
                // The data is a serialized Entry<V>, not just V
                serde_json::from_str(&data).map_err(|e| {
                    CacheError::backend(
                        "serialization",
                        "",
                        format!("Deserialization failed: {}", e),
                    )
                })
            }
        }
    }

    /// Get the expiry timestamp.
    pub fn expires_at(&self) -> Option<i64> {
        match self {
            StoredEntry::Typed { expires_at, .. } => *expires_at,
            StoredEntry::Serialized { expires_at, .. } => *expires_at,
        }
    }

    /// Check if the entry has expired and should not be used.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at().is_some_and(|at| now_ms >= at)
    }

    /// Remaining lifetime in whole seconds, rounded up.
    ///
    /// `None` for entries that never expire, `Some(0)` once expired.
    pub fn remaining_secs(&self, now_ms: i64) -> Option<u64> {
        self.expires_at()
            .map(|at| ((at - now_ms).max(0) as u64).div_ceil(1000))
    }

    /// Convert Typed entry to Serialized format using the stored serializer.
    pub fn to_serialized(self) -> Result<Self, CacheError> {
        match self {
            StoredEntry::Serialized { .. } => Ok(self),
            StoredEntry::Typed {
                serializer: Some(ser),
                expires_at,
                ..
            } => Ok(StoredEntry::Serialized {
                data: ser()?,
                expires_at,
            }),
            StoredEntry::Typed {
                serializer: None, ..
            } => Err(CacheError::backend(
                "serialization",
                "",
                "Cannot serialize Typed entry: no serializer available",
            )),
        }
    }

    /// Convert StoredEntry to match the target storage mode.
    ///
    /// Serialized entries are left alone for typed stores; `into_typed`
    /// handles both variants on the way out.
    pub fn convert_for_mode(self, target_mode: StorageMode) -> Result<Self, CacheError> {
        match (&self, target_mode) {
            (StoredEntry::Typed { .. }, StorageMode::Serialized) => self.to_serialized(),
            _ => Ok(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_expiry() {
        let entry = Entry::new("v", Some(1_000));
        assert!(!entry.is_expired(999));
        assert!(entry.is_expired(1_000));

        let forever = Entry::new("v", None);
        assert!(!forever.is_expired(i64::MAX));
    }

    #[test]
    fn test_typed_round_trip() {
        let stored = StoredEntry::from_typed_with_serializer(vec![1u32, 2, 3], None);
        let entry: Entry<Vec<u32>> = stored.into_typed().unwrap();
        assert_eq!(entry.value, vec![1, 2, 3]);
        assert_eq!(entry.expires_at, None);
    }

    #[test]
    fn test_typed_downcast_mismatch() {
        let stored = StoredEntry::from_typed(42u64, None);
        let err = stored.into_typed::<String>().unwrap_err();
        assert!(err.is_backend_failure());
    }

    #[test]
    fn test_convert_for_serialized_store() {
        let stored =
            StoredEntry::from_typed_with_serializer("cached".to_string(), Some(5_000))
                .convert_for_mode(StorageMode::Serialized)
                .unwrap();

        match &stored {
            StoredEntry::Serialized { data, expires_at } => {
                assert_eq!(data, r#"{"value":"cached","expires_at":5000}"#);
                assert_eq!(*expires_at, Some(5_000));
            }
            other => panic!("expected serialized entry, got {:?}", other),
        }

        let entry: Entry<String> = stored.into_typed().unwrap();
        assert_eq!(entry.value, "cached");
    }

    #[test]
    fn test_typed_without_serializer_cannot_serialize() {
        let stored = StoredEntry::from_typed(1u8, None);
        assert!(stored.convert_for_mode(StorageMode::Serialized).is_err());
    }

    #[test]
    fn test_remaining_secs() {
        let stored = StoredEntry::from_serialized(String::new(), Some(10_500));
        assert_eq!(stored.remaining_secs(10_000), Some(1));
        assert_eq!(stored.remaining_secs(5_000), Some(6));
        assert_eq!(stored.remaining_secs(20_000), Some(0));

        let forever = StoredEntry::from_serialized(String::new(), None);
        assert_eq!(forever.remaining_secs(0), None);
    }
}
