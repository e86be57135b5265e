//! Cache configuration and result types.

use std::fmt;

/// Configuration for one cache namespace.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Namespace the keys live under (e.g. "items"). Invalidation drops the
    /// whole namespace at once.
    pub namespace: String,

    /// Optional TTL in seconds for cached values.
    /// If None, values are cached until invalidated.
    pub ttl_seconds: Option<u64>,
}

impl CacheConfig {
    pub fn new(namespace: impl Into<String>, ttl_seconds: Option<u64>) -> Self {
        Self {
            namespace: namespace.into(),
            ttl_seconds,
        }
    }

    /// Cache until explicitly invalidated.
    pub fn permanent(namespace: impl Into<String>) -> Self {
        Self::new(namespace, None)
    }

    pub fn with_ttl(namespace: impl Into<String>, ttl_seconds: u64) -> Self {
        Self::new(namespace, Some(ttl_seconds))
    }
}

/// Where a value came from. Implements `Display` so it can feed straight
/// into log fields and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
    /// Value was found in redis.
    Hit,
    /// Key was absent (or unreadable), value came from the producer.
    Miss,
    /// Redis was unreachable, value came from the producer.
    Unavailable,
}

impl fmt::Display for CacheSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheSource::Hit => write!(f, "hit"),
            CacheSource::Miss => write!(f, "miss"),
            CacheSource::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// A value plus the path it took to get here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheResult<V> {
    pub value: V,
    pub source: CacheSource,
}

impl<V> CacheResult<V> {
    pub fn was_cached(&self) -> bool {
        self.source == CacheSource::Hit
    }

    pub fn invoked_producer(&self) -> bool {
        !self.was_cached()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_result_helpers() {
        let result = CacheResult {
            value: 42,
            source: CacheSource::Hit,
        };
        assert!(result.was_cached());
        assert!(!result.invoked_producer());

        let result = CacheResult {
            value: 42,
            source: CacheSource::Miss,
        };
        assert!(!result.was_cached());
        assert!(result.invoked_producer());

        let result = CacheResult {
            value: 42,
            source: CacheSource::Unavailable,
        };
        assert!(!result.was_cached());
        assert!(result.invoked_producer());
    }

    #[test]
    fn test_cache_source_display() {
        assert_eq!(CacheSource::Hit.to_string(), "hit");
        assert_eq!(CacheSource::Miss.to_string(), "miss");
        assert_eq!(CacheSource::Unavailable.to_string(), "unavailable");
    }
}
