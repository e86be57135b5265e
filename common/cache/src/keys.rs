//! Deterministic cache key derivation.

use sha1::{Digest, Sha1};

/// Derive the redis key for an operation and its arguments:
/// `{namespace}:{operation}:{sha1(operation, args)}`.
///
/// The digest covers the argument values in order, with a separator byte so
/// `["ab"]` and `["a", "b"]` never collide. Two calls with the same operation
/// and arguments always land on the same key, which is what makes concurrent
/// producers converge on a single entry.
pub fn cache_key(namespace: &str, operation: &str, args: &[&str]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(operation.as_bytes());
    for arg in args {
        hasher.update([0u8]);
        hasher.update(arg.as_bytes());
    }
    format!("{namespace}:{operation}:{}", hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_inputs_same_key() {
        let a = cache_key("items", "list", &["1", "2"]);
        let b = cache_key("items", "list", &["1", "2"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_is_namespaced() {
        let key = cache_key("items", "list", &[]);
        assert!(key.starts_with("items:list:"));
    }

    #[test]
    fn test_argument_order_matters() {
        let a = cache_key("items", "list", &["1", "2"]);
        let b = cache_key("items", "list", &["2", "1"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_argument_boundaries_are_unambiguous() {
        let a = cache_key("items", "list", &["ab"]);
        let b = cache_key("items", "list", &["a", "b"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_different_operations_do_not_collide() {
        let a = cache_key("items", "list", &["1"]);
        let b = cache_key("items", "detail", &["1"]);
        assert_ne!(a, b);
    }
}
