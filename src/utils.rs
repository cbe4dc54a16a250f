//! Shared utilities for the cache library.

use std::time::{SystemTime, UNIX_EPOCH};

/// Get the current time in milliseconds since UNIX epoch.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Simple pseudo-random number generator (0.0 to 1.0).
/// This avoids adding a dependency on rand crate.
pub fn rand_simple() -> f64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let state = RandomState::new();
    let mut hasher = state.build_hasher();
    hasher.write_u64(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default(),
    );
    (hasher.finish() as f64) / (u64::MAX as f64)
}

/// Convert an identifier to snake_case.
///
/// `BlogPost` -> `blog_post`, `HTTPRequest` -> `http_request`, `post2Tag` -> `post2_tag`.
pub fn snake_case(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                None | Some('_') => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}

/// Render a Rust type path as a flat snake_case name.
///
/// Generic arguments are dropped and path segments joined with `_`, so
/// `app::models::BlogPost<u64>` becomes `app_models_blog_post`.
pub fn type_path_name(type_name: &str) -> String {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.split("::")
        .filter(|segment| !segment.is_empty())
        .map(snake_case)
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms_is_positive() {
        let now = now_ms();
        assert!(now > 0);
    }

    #[test]
    fn test_rand_simple_in_range() {
        for _ in 0..100 {
            let r = rand_simple();
            assert!((0.0..=1.0).contains(&r));
        }
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("BlogPost"), "blog_post");
        assert_eq!(snake_case("User"), "user");
        assert_eq!(snake_case("HTTPRequest"), "http_request");
        assert_eq!(snake_case("already_snake"), "already_snake");
        assert_eq!(snake_case("post2Tag"), "post2_tag");
    }

    #[test]
    fn test_type_path_name() {
        assert_eq!(
            type_path_name("app::models::BlogPost"),
            "app_models_blog_post"
        );
        assert_eq!(type_path_name("app::Wrapper<alloc::string::String>"), "app_wrapper");
        assert_eq!(type_path_name("Document"), "document");
    }
}
