/// Error type for cache operations.
///
/// Only two kinds exist: a compute unit whose identity cannot be resolved, and
/// anything the backend reports. Neither is retried or suppressed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// The compute unit could not be turned into a stable identity.
    #[error("unsupported compute unit ({shape}): {reason}")]
    UnsupportedComputeUnit { shape: &'static str, reason: String },

    /// A backend operation failed (connectivity, serialization, ...).
    #[error("[{tier}] cache error for key '{key}': {message}")]
    Backend {
        tier: String,
        key: String,
        message: String,
    },
}

impl CacheError {
    /// Create a new backend error.
    pub fn backend(
        tier: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        CacheError::Backend {
            tier: tier.into(),
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a new identity resolution error.
    pub fn unsupported(shape: &'static str, reason: impl Into<String>) -> Self {
        CacheError::UnsupportedComputeUnit {
            shape,
            reason: reason.into(),
        }
    }

    pub fn is_backend_failure(&self) -> bool {
        matches!(self, CacheError::Backend { .. })
    }
}
