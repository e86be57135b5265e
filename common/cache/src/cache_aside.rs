//! Cache-aside wrapper around expensive read operations.
//!
//! Reads check redis first and fall back to a producer function on a miss,
//! writing the produced value back with the configured TTL. Every redis
//! failure degrades to "produce it fresh": a failed get is a miss, a failed
//! set is logged and counted but never surfaced.

use crate::{keys, CacheConfig, CacheResult, CacheSource};
use common_redis::{Client as RedisClient, CustomRedisError};
use metrics::counter;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

pub struct CacheAside {
    redis: Arc<dyn RedisClient + Send + Sync>,
    config: CacheConfig,
}

impl CacheAside {
    pub fn new(redis: Arc<dyn RedisClient + Send + Sync>, config: CacheConfig) -> Self {
        Self { redis, config }
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    /// Return the cached value for `(operation, args)`, or invoke `producer`
    /// exactly once and cache what it returns.
    ///
    /// Producer errors propagate unchanged. Cache errors never do: a failed
    /// read behaves like a miss and a failed write-back leaves the fresh
    /// value uncached until the next call.
    pub async fn get_or_produce<V, E, F, Fut>(
        &self,
        operation: &str,
        args: &[&str],
        producer: F,
    ) -> Result<CacheResult<V>, E>
    where
        V: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Send + Sync,
    {
        let cache_key = keys::cache_key(&self.config.namespace, operation, args);

        let source = match self.get_cached(&cache_key).await {
            Ok(value) => {
                self.count("get", "hit");
                return Ok(CacheResult {
                    value,
                    source: CacheSource::Hit,
                });
            }
            Err(CustomRedisError::NotFound) => {
                self.count("get", "miss");
                CacheSource::Miss
            }
            Err(CustomRedisError::ParseError(err)) => {
                // Undecodable entry: refresh it from the producer below.
                tracing::warn!(key = %cache_key, %err, "dropping corrupted cache entry");
                self.count("get", "corrupted");
                CacheSource::Miss
            }
            Err(err) => {
                tracing::warn!(key = %cache_key, %err, "cache read failed, producing fresh value");
                self.count("get", "error");
                CacheSource::Unavailable
            }
        };

        let value = producer().await?;
        self.store(&cache_key, &value).await;

        Ok(CacheResult { value, source })
    }

    /// Drop every entry in this namespace. Best-effort: failures are logged
    /// and counted, never returned.
    pub async fn invalidate(&self) {
        let pattern = format!("{}:*", self.config.namespace);
        match self.redis.del_by_pattern(pattern).await {
            Ok(removed) => {
                tracing::debug!(namespace = %self.config.namespace, removed, "cache namespace invalidated");
                self.count("invalidate", "ok");
            }
            Err(err) => {
                tracing::warn!(namespace = %self.config.namespace, %err, "cache invalidation failed");
                self.count("invalidate", "error");
            }
        }
    }

    async fn get_cached<V>(&self, cache_key: &str) -> Result<V, CustomRedisError>
    where
        V: DeserializeOwned,
    {
        let serialized = self.redis.get(cache_key.to_string()).await?;
        serde_json::from_str(&serialized).map_err(|e| {
            CustomRedisError::ParseError(format!("failed to deserialize cached value: {e}"))
        })
    }

    /// Best-effort write-back.
    async fn store<V>(&self, cache_key: &str, value: &V)
    where
        V: Serialize,
    {
        let serialized = match serde_json::to_string(value) {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(key = %cache_key, %err, "failed to serialize value for cache");
                self.count("set", "error");
                return;
            }
        };

        let result = match self.config.ttl_seconds {
            Some(ttl) => self.redis.setex(cache_key.to_string(), serialized, ttl).await,
            None => {
                // No TTL variant on the client trait: use a year, which is
                // as good as forever for entries we invalidate explicitly.
                self.redis
                    .setex(cache_key.to_string(), serialized, 365 * 24 * 3600)
                    .await
            }
        };

        match result {
            Ok(()) => self.count("set", "ok"),
            Err(err) => {
                tracing::warn!(key = %cache_key, %err, "cache write failed");
                self.count("set", "error");
            }
        }
    }

    fn count(&self, operation: &'static str, result: &'static str) {
        counter!(
            "cache_operations_total",
            "namespace" => self.config.namespace.clone(),
            "operation" => operation,
            "result" => result,
        )
        .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_redis::MockRedisClient;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct TestData {
        id: i32,
        name: String,
    }

    fn setup_cache(redis: MockRedisClient) -> CacheAside {
        CacheAside::new(Arc::new(redis), CacheConfig::with_ttl("test", 300))
    }

    fn sample() -> TestData {
        TestData {
            id: 1,
            name: "sample".to_string(),
        }
    }

    #[tokio::test]
    async fn test_hit_skips_producer() {
        let key = keys::cache_key("test", "detail", &["1"]);
        let redis = MockRedisClient::new().seed(&key, &serde_json::to_string(&sample()).unwrap());
        let cache = setup_cache(redis);

        let result = cache
            .get_or_produce::<TestData, String, _, _>("detail", &["1"], || async {
                panic!("producer must not run on a cache hit")
            })
            .await
            .unwrap();

        assert_eq!(result.value, sample());
        assert_eq!(result.source, CacheSource::Hit);
    }

    #[tokio::test]
    async fn test_miss_produces_and_caches() {
        let redis = MockRedisClient::new();
        let cache = setup_cache(redis.clone());

        let result = cache
            .get_or_produce("detail", &["1"], || async {
                Ok::<TestData, String>(sample())
            })
            .await
            .unwrap();

        assert_eq!(result.value, sample());
        assert_eq!(result.source, CacheSource::Miss);

        // Write-back happened under the derived key
        let key = keys::cache_key("test", "detail", &["1"]);
        let stored = redis.stored_value(&key).expect("value should be cached");
        assert_eq!(serde_json::from_str::<TestData>(&stored).unwrap(), sample());

        // Second read is now a hit
        let result = cache
            .get_or_produce::<TestData, String, _, _>("detail", &["1"], || async {
                panic!("second read should be served from cache")
            })
            .await
            .unwrap();
        assert_eq!(result.source, CacheSource::Hit);
    }

    #[tokio::test]
    async fn test_redis_down_still_serves_fresh_value() {
        let mut redis = MockRedisClient::new();
        redis.break_connection();
        let cache = setup_cache(redis);

        let result = cache
            .get_or_produce("detail", &["1"], || async {
                Ok::<TestData, String>(sample())
            })
            .await
            .unwrap();

        assert_eq!(result.value, sample());
        assert_eq!(result.source, CacheSource::Unavailable);
    }

    #[tokio::test]
    async fn test_corrupted_entry_is_refreshed() {
        let key = keys::cache_key("test", "detail", &["1"]);
        let redis = MockRedisClient::new().seed(&key, "not json{");
        let cache = setup_cache(redis.clone());

        let result = cache
            .get_or_produce("detail", &["1"], || async {
                Ok::<TestData, String>(sample())
            })
            .await
            .unwrap();

        assert_eq!(result.value, sample());
        assert_eq!(result.source, CacheSource::Miss);

        let stored = redis.stored_value(&key).unwrap();
        assert_eq!(serde_json::from_str::<TestData>(&stored).unwrap(), sample());
    }

    #[tokio::test]
    async fn test_producer_error_propagates() {
        let cache = setup_cache(MockRedisClient::new());

        let result = cache
            .get_or_produce("detail", &["1"], || async {
                Err::<TestData, String>("producer error".to_string())
            })
            .await;

        assert_eq!(result.unwrap_err(), "producer error");
    }

    #[tokio::test]
    async fn test_invalidate_drops_only_this_namespace() {
        let redis = MockRedisClient::new()
            .seed("test:list:aaaa", "1")
            .seed("test:detail:bbbb", "2")
            .seed("other:list:cccc", "3");
        let cache = setup_cache(redis.clone());

        cache.invalidate().await;

        assert!(!redis.contains_key("test:list:aaaa"));
        assert!(!redis.contains_key("test:detail:bbbb"));
        assert!(redis.contains_key("other:list:cccc"));
    }

    #[tokio::test]
    async fn test_invalidate_swallows_redis_errors() {
        let mut redis = MockRedisClient::new();
        redis.break_connection();
        let cache = setup_cache(redis);

        // Must not panic or error
        cache.invalidate().await;
    }
}
