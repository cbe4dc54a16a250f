//! Compute units and their identities.
//!
//! A [`ComputeUnit`] pairs a zero-argument computation with the shape it was
//! built from. The shape is resolved into an identity string when the unit is
//! used, and that identity becomes the last segment of the cache key.
//!
//! Identities key off where a computation is *defined*, never off the values it
//! captures:
//!
//! - closures: `{scope}::{closure}:{file}:{line}:{column}:{fingerprint}`, the
//!   position of the [`ComputeUnit::closure`] call plus a fingerprint of the
//!   closure's own type
//! - free functions: the function path
//! - methods: `{owner}::{member}_static` or `{owner}::{member}_instance`
//! - invokable types: `{type}::default`
//!
//! Reusing one `ComputeUnit` (or a clone of it) across calls therefore hits the
//! same entry, while two closures written at different positions never collide
//! even when their bodies are identical. Declaring a closure inline inside a
//! loop reuses the position, so it is the same unit on every iteration.
//!
//! The fingerprint hashes the closure's `TypeId`. It tells apart closures that
//! reach [`ComputeUnit::closure`] through one shared helper, and it is stable
//! for a given build only: a rebuilt binary may derive different closure keys.

use std::any::{TypeId, type_name};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::Location;
use std::sync::Arc;

use crate::error::CacheError;

/// A type with a single default invocation.
pub trait Invokable<V>: Send + Sync + 'static {
    fn invoke(&self) -> V;
}

/// How a method-based unit is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Static,
    Instance,
}

impl Dispatch {
    fn suffix(self) -> &'static str {
        match self {
            Dispatch::Static => "static",
            Dispatch::Instance => "instance",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Shape {
    Closure {
        scope: &'static str,
        location: &'static Location<'static>,
        fingerprint: u64,
    },
    Function {
        path: &'static str,
    },
    Method {
        owner: &'static str,
        member: &'static str,
        dispatch: Dispatch,
    },
    Invokable {
        type_name: &'static str,
    },
}

impl Shape {
    fn name(&self) -> &'static str {
        match self {
            Shape::Closure { .. } => "closure",
            Shape::Function { .. } => "function",
            Shape::Method { .. } => "method",
            Shape::Invokable { .. } => "invokable",
        }
    }
}

/// A cacheable zero-argument computation.
pub struct ComputeUnit<V> {
    shape: Shape,
    call: Arc<dyn Fn() -> V + Send + Sync>,
}

impl<V> Clone for ComputeUnit<V> {
    fn clone(&self) -> Self {
        ComputeUnit {
            shape: self.shape,
            call: Arc::clone(&self.call),
        }
    }
}

impl<V> fmt::Debug for ComputeUnit<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputeUnit")
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

impl<V: 'static> ComputeUnit<V> {
    /// Wrap an anonymous computation.
    ///
    /// The identity records the source position of this call, so helpers that
    /// build units on behalf of their callers should be `#[track_caller]` too.
    ///
    /// # Example
    /// ```ignore
    /// let published = ComputeUnit::closure(move || db.count_published());
    /// ```
    #[track_caller]
    pub fn closure<F>(f: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
    {
        ComputeUnit {
            shape: Shape::Closure {
                scope: type_name::<F>(),
                location: Location::caller(),
                fingerprint: type_fingerprint::<F>(),
            },
            call: Arc::new(f),
        }
    }

    /// Wrap a named free function or associated function item.
    ///
    /// Closures and function pointers carry no stable name and fail to resolve.
    pub fn function<F>(f: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
    {
        ComputeUnit {
            shape: Shape::Function {
                path: type_name::<F>(),
            },
            call: Arc::new(f),
        }
    }

    /// Wrap a static method `O::member`.
    pub fn static_method<O, F>(member: &'static str, f: F) -> Self
    where
        O: ?Sized + 'static,
        F: Fn() -> V + Send + Sync + 'static,
    {
        ComputeUnit {
            shape: Shape::Method {
                owner: type_name::<O>(),
                member,
                dispatch: Dispatch::Static,
            },
            call: Arc::new(f),
        }
    }

    /// Wrap a method called on `receiver`.
    ///
    /// The identity depends on the receiver's type, not on the receiver itself.
    pub fn instance_method<O>(receiver: Arc<O>, member: &'static str, method: fn(&O) -> V) -> Self
    where
        O: Send + Sync + 'static,
    {
        ComputeUnit {
            shape: Shape::Method {
                owner: type_name::<O>(),
                member,
                dispatch: Dispatch::Instance,
            },
            call: Arc::new(move || method(&receiver)),
        }
    }

    /// Wrap an invokable value.
    pub fn invokable<I>(target: I) -> Self
    where
        I: Invokable<V>,
    {
        let target = Arc::new(target);
        ComputeUnit {
            shape: Shape::Invokable {
                type_name: type_name::<I>(),
            },
            call: Arc::new(move || target.invoke()),
        }
    }

    /// Wrap an invokable type; a fresh `I::default()` is invoked on every run.
    pub fn of<I>() -> Self
    where
        I: Invokable<V> + Default,
    {
        ComputeUnit {
            shape: Shape::Invokable {
                type_name: type_name::<I>(),
            },
            call: Arc::new(|| I::default().invoke()),
        }
    }
}

impl<V> ComputeUnit<V> {
    /// Run the computation.
    pub fn invoke(&self) -> V {
        (self.call)()
    }

    /// The shape this unit was built from: `closure`, `function`, `method` or `invokable`.
    pub fn shape(&self) -> &'static str {
        self.shape.name()
    }

    /// Resolve the stable identity of this unit.
    pub fn identity(&self) -> Result<String, CacheError> {
        match self.shape {
            Shape::Closure {
                scope,
                location,
                fingerprint,
            } => Ok(format!(
                "{}::{{closure}}:{}:{}:{}:{:016x}",
                defining_scope(scope),
                location.file(),
                location.line(),
                location.column(),
                fingerprint
            )),
            Shape::Function { path } => {
                if path.contains("{{closure}}") {
                    return Err(CacheError::unsupported(
                        "function",
                        format!("`{path}` is a closure and has no stable name, use ComputeUnit::closure"),
                    ));
                }
                if !is_item_path(path) {
                    return Err(CacheError::unsupported(
                        "function",
                        format!("`{path}` is not a named function"),
                    ));
                }
                Ok(path.to_string())
            }
            Shape::Method {
                owner,
                member,
                dispatch,
            } => {
                if !is_identifier(member) {
                    return Err(CacheError::unsupported(
                        "method",
                        format!("`{member}` is not a valid member name of `{owner}`"),
                    ));
                }
                Ok(format!("{}::{}_{}", owner, member, dispatch.suffix()))
            }
            Shape::Invokable { type_name } => Ok(format!("{type_name}::default")),
        }
    }
}

fn type_fingerprint<F: 'static>() -> u64 {
    let mut hasher = DefaultHasher::new();
    TypeId::of::<F>().hash(&mut hasher);
    hasher.finish()
}

/// Everything before the first closure segment of a closure's type name.
fn defining_scope(type_name: &str) -> &str {
    match type_name.find("::{{closure}}") {
        Some(idx) => &type_name[..idx],
        None => type_name,
    }
}

/// `crate::module::item`, optionally with generic arguments.
fn is_item_path(path: &str) -> bool {
    let base = path.split('<').next().unwrap_or(path);
    base.contains("::") && base.split("::").all(is_identifier)
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_drafts() -> u32 {
        3
    }

    struct Report;

    impl Report {
        fn totals() -> u32 {
            10
        }

        fn row_count(&self) -> u32 {
            4
        }
    }

    #[derive(Default)]
    struct Greeting;

    impl Invokable<String> for Greeting {
        fn invoke(&self) -> String {
            "hello".to_string()
        }
    }

    #[test]
    fn test_same_unit_same_identity() {
        let unit = ComputeUnit::closure(|| 1);
        let again = unit.clone();
        assert_eq!(unit.identity().unwrap(), unit.identity().unwrap());
        assert_eq!(unit.identity().unwrap(), again.identity().unwrap());
    }

    #[test]
    fn test_identical_closures_on_different_lines_differ() {
        let first = ComputeUnit::closure(|| "same body");
        let second = ComputeUnit::closure(|| "same body");
        assert_ne!(first.identity().unwrap(), second.identity().unwrap());
    }

    fn wrap<F>(f: F) -> ComputeUnit<&'static str>
    where
        F: Fn() -> &'static str + Send + Sync + 'static,
    {
        ComputeUnit::closure(f)
    }

    #[test]
    fn test_closures_through_one_helper_differ() {
        let drafts = wrap(|| "drafts");
        let published = wrap(|| "published");
        assert_ne!(drafts.identity().unwrap(), published.identity().unwrap());
        assert_eq!(drafts.identity().unwrap(), drafts.clone().identity().unwrap());
    }

    #[test]
    fn test_closure_identity_shape() {
        let unit = ComputeUnit::closure(|| 0u8);
        let identity = unit.identity().unwrap();
        assert!(
            identity.starts_with(
                "model_cache::compute::tests::test_closure_identity_shape::{closure}:"
            ),
            "{identity}"
        );
        assert!(identity.contains(file!()), "{identity}");
        assert_eq!(unit.shape(), "closure");
    }

    #[test]
    fn test_closure_built_in_loop_is_one_unit() {
        let identities: Vec<String> = (0..3)
            .map(|i| ComputeUnit::closure(move || i).identity().unwrap())
            .collect();
        assert!(identities.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_function_identity() {
        let unit = ComputeUnit::function(count_drafts);
        assert_eq!(
            unit.identity().unwrap(),
            "model_cache::compute::tests::count_drafts"
        );
        assert_eq!(unit.invoke(), 3);
    }

    #[test]
    fn test_function_rejects_closure() {
        let unit = ComputeUnit::function(|| 5);
        let err = unit.identity().unwrap_err();
        assert!(matches!(
            err,
            CacheError::UnsupportedComputeUnit {
                shape: "function",
                ..
            }
        ));
        // The computation itself is still usable.
        assert_eq!(unit.invoke(), 5);
    }

    #[test]
    fn test_function_rejects_pointer() {
        let pointer: fn() -> u32 = count_drafts;
        let err = ComputeUnit::function(pointer).identity().unwrap_err();
        assert!(matches!(err, CacheError::UnsupportedComputeUnit { .. }));
    }

    #[test]
    fn test_static_and_instance_methods() {
        let by_type = ComputeUnit::static_method::<Report, _>("totals", Report::totals);
        assert_eq!(
            by_type.identity().unwrap(),
            "model_cache::compute::tests::Report::totals_static"
        );

        let by_value = ComputeUnit::instance_method(Arc::new(Report), "row_count", Report::row_count);
        assert_eq!(
            by_value.identity().unwrap(),
            "model_cache::compute::tests::Report::row_count_instance"
        );
        assert_eq!(by_value.invoke(), 4);
    }

    #[test]
    fn test_method_rejects_bad_member() {
        let unit = ComputeUnit::static_method::<Report, _>("", Report::totals);
        assert!(matches!(
            unit.identity(),
            Err(CacheError::UnsupportedComputeUnit { shape: "method", .. })
        ));
    }

    #[test]
    fn test_invokable_identity() {
        let by_value = ComputeUnit::invokable(Greeting);
        let by_type = ComputeUnit::<String>::of::<Greeting>();
        let expected = "model_cache::compute::tests::Greeting::default";
        assert_eq!(by_value.identity().unwrap(), expected);
        assert_eq!(by_type.identity().unwrap(), expected);
        assert_eq!(by_type.invoke(), "hello");
    }
}
