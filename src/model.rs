//! Capabilities an entity type implements to take part in caching.
//!
//! [`Cachable`] is the static side (per type), [`Flushable`] the object-safe
//! side the invalidation trigger works with. Every `Cachable` is `Flushable`
//! through a blanket impl, so a model only ever implements `Cachable`.

use std::any::type_name;

use crate::key::with_prefix;
use crate::utils::type_path_name;

/// Permission marker used when no principal is supplied.
pub const GUEST_PERMISSIONS_KEY: &str = "guest";

/// An entity type whose derived values can be cached and invalidated.
///
/// # Example
///
/// ```ignore
/// struct Post { id: u64 }
///
/// impl Cachable for Post {
///     fn cache_id(&self) -> String {
///         self.id.to_string()
///     }
/// }
/// ```
pub trait Cachable: Send + Sync + 'static {
    /// Identifier of this instance, unique within the type.
    fn cache_id(&self) -> String;

    /// Namespace prepended to every tag and key of this type.
    ///
    /// Empty by default. Use it for multi-tenant separation.
    fn cache_prefix() -> String
    where
        Self: Sized,
    {
        String::new()
    }

    /// Unprefixed type name used for the type tag.
    ///
    /// Defaults to the Rust type path in snake_case, `app::models::BlogPost`
    /// becoming `app_models_blog_post`.
    fn model_name() -> String
    where
        Self: Sized,
    {
        type_path_name(type_name::<Self>())
    }

    /// Tag shared by every entry that depends on any instance of this type.
    fn model_tag() -> String
    where
        Self: Sized,
    {
        with_prefix(&Self::cache_prefix(), &Self::model_name())
    }

    /// Tags added to every entry cached through this type.
    fn default_tags() -> Vec<String>
    where
        Self: Sized,
    {
        Vec::new()
    }

    /// Return true to keep cached entries alive when this instance changes.
    fn should_skip_flushing(&self) -> bool {
        false
    }
}

/// The view of an entity the invalidation trigger needs.
pub trait Flushable: Send + Sync {
    /// Tag of the entity's type.
    fn type_tag(&self) -> String;

    /// Tag of this particular instance, `{type_tag}:{id}`.
    fn instance_tag(&self) -> String;

    /// Whether lifecycle events on this instance should leave the cache alone.
    fn skip_flush(&self) -> bool;
}

impl<T: Cachable> Flushable for T {
    fn type_tag(&self) -> String {
        T::model_tag()
    }

    fn instance_tag(&self) -> String {
        format!("{}:{}", T::model_tag(), self.cache_id())
    }

    fn skip_flush(&self) -> bool {
        self.should_skip_flushing()
    }
}

/// A requester whose permissions affect computed values.
pub trait Permissable: Send + Sync {
    /// Marker partitioning cache entries per permission set.
    fn permissions_key(&self) -> String;
}

/// Permission marker for an optional principal, falling back to
/// [`GUEST_PERMISSIONS_KEY`].
pub fn permissions_marker(principal: Option<&dyn Permissable>) -> String {
    principal
        .map(|p| p.permissions_key())
        .unwrap_or_else(|| GUEST_PERMISSIONS_KEY.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BlogPost {
        id: u32,
    }

    impl Cachable for BlogPost {
        fn cache_id(&self) -> String {
            self.id.to_string()
        }
    }

    struct TenantInvoice {
        id: u32,
        archived: bool,
    }

    impl Cachable for TenantInvoice {
        fn cache_id(&self) -> String {
            self.id.to_string()
        }

        fn cache_prefix() -> String {
            "acme".to_string()
        }

        fn model_name() -> String {
            "invoice".to_string()
        }

        fn should_skip_flushing(&self) -> bool {
            self.archived
        }
    }

    struct Admin;

    impl Permissable for Admin {
        fn permissions_key(&self) -> String {
            "role:admin".to_string()
        }
    }

    #[test]
    fn test_default_model_tag_from_type_path() {
        assert_eq!(BlogPost::model_tag(), "model_cache_model_tests_blog_post");
    }

    #[test]
    fn test_instance_tag_extends_type_tag() {
        let post = BlogPost { id: 7 };
        assert_eq!(post.type_tag(), BlogPost::model_tag());
        assert_eq!(post.instance_tag(), format!("{}:7", BlogPost::model_tag()));
        assert!(!post.skip_flush());
    }

    #[test]
    fn test_prefixed_tags() {
        let invoice = TenantInvoice {
            id: 3,
            archived: true,
        };
        assert_eq!(invoice.type_tag(), "acme:invoice");
        assert_eq!(invoice.instance_tag(), "acme:invoice:3");
        assert!(invoice.skip_flush());
    }

    #[test]
    fn test_permissions_marker() {
        assert_eq!(permissions_marker(Some(&Admin)), "role:admin");
        assert_eq!(permissions_marker(None), "guest");
    }
}
