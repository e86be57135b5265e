use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::{Client, CustomRedisError};

/// In-memory stand-in for a real redis used by unit tests. Values persist
/// across calls, so set-then-get behaves like the real thing, and
/// `break_connection` makes every command fail with `Timeout` to exercise
/// degraded paths. All calls are recorded for assertions.
#[derive(Clone, Default)]
pub struct MockRedisClient {
    store: Arc<Mutex<HashMap<String, String>>>,
    counters: Arc<Mutex<HashMap<String, i64>>>,
    broken: Arc<AtomicBool>,
    calls: Arc<Mutex<Vec<MockRedisCall>>>,
}

impl MockRedisClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock<'a, T>(mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        match mutex.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn check_broken(&self) -> Result<(), CustomRedisError> {
        if self.broken.load(Ordering::SeqCst) {
            Err(CustomRedisError::Timeout)
        } else {
            Ok(())
        }
    }

    /// Pre-populate a key, as if something had cached it earlier.
    pub fn seed(&mut self, key: &str, value: &str) -> Self {
        Self::lock(&self.store).insert(key.to_owned(), value.to_owned());
        self.clone()
    }

    /// Make every subsequent command fail with a timeout.
    pub fn break_connection(&mut self) -> Self {
        self.broken.store(true, Ordering::SeqCst);
        self.clone()
    }

    /// Undo `break_connection`.
    pub fn restore_connection(&mut self) -> Self {
        self.broken.store(false, Ordering::SeqCst);
        self.clone()
    }

    pub fn get_calls(&self) -> Vec<MockRedisCall> {
        Self::lock(&self.calls).clone()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        Self::lock(&self.store).contains_key(key)
    }

    pub fn stored_value(&self, key: &str) -> Option<String> {
        Self::lock(&self.store).get(key).cloned()
    }

    fn record(&self, op: &str, key: &str, value: MockRedisValue) {
        Self::lock(&self.calls).push(MockRedisCall {
            op: op.to_string(),
            key: key.to_string(),
            value,
        });
    }
}

#[derive(Debug, Clone)]
pub enum MockRedisValue {
    None,
    String(String),
    StringWithTtl(String, u64),
    I64(i64),
}

#[derive(Debug, Clone)]
pub struct MockRedisCall {
    pub op: String,
    pub key: String,
    pub value: MockRedisValue,
}

#[async_trait]
impl Client for MockRedisClient {
    async fn get(&self, key: String) -> Result<String, CustomRedisError> {
        self.record("get", &key, MockRedisValue::None);
        self.check_broken()?;

        match Self::lock(&self.store).get(&key) {
            Some(value) => Ok(value.clone()),
            None => Err(CustomRedisError::NotFound),
        }
    }

    async fn setex(&self, key: String, value: String, seconds: u64) -> Result<(), CustomRedisError> {
        self.record(
            "setex",
            &key,
            MockRedisValue::StringWithTtl(value.clone(), seconds),
        );
        self.check_broken()?;

        Self::lock(&self.store).insert(key, value);
        Ok(())
    }

    async fn incr(&self, key: String, by: i64) -> Result<i64, CustomRedisError> {
        self.record("incr", &key, MockRedisValue::I64(by));
        self.check_broken()?;

        let mut counters = Self::lock(&self.counters);
        let count = counters.entry(key).or_insert(0);
        *count += by;
        Ok(*count)
    }

    async fn del(&self, key: String) -> Result<(), CustomRedisError> {
        self.record("del", &key, MockRedisValue::None);
        self.check_broken()?;

        Self::lock(&self.store).remove(&key);
        Ok(())
    }

    async fn del_by_pattern(&self, pattern: String) -> Result<u64, CustomRedisError> {
        self.record("del_by_pattern", &pattern, MockRedisValue::None);
        self.check_broken()?;

        // Only trailing-wildcard patterns are supported, which is all the
        // cache namespaces use.
        let prefix = pattern.strip_suffix('*').unwrap_or(&pattern);
        let mut store = Self::lock(&self.store);
        let matching: Vec<String> = store
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for key in &matching {
            store.remove(key);
        }
        Ok(matching.len() as u64)
    }

    async fn ping(&self) -> Result<(), CustomRedisError> {
        self.record("ping", "", MockRedisValue::None);
        self.check_broken()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get_round_trips() {
        let client = MockRedisClient::new();
        client
            .setex("k1".to_string(), "v1".to_string(), 60)
            .await
            .unwrap();

        assert_eq!(client.get("k1".to_string()).await.unwrap(), "v1");
    }

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let client = MockRedisClient::new();
        let err = client.get("absent".to_string()).await.unwrap_err();
        assert!(matches!(err, CustomRedisError::NotFound));
    }

    #[tokio::test]
    async fn test_broken_connection_times_out_everything() {
        let mut client = MockRedisClient::new().seed("k1", "v1");
        client.break_connection();

        assert!(matches!(
            client.get("k1".to_string()).await,
            Err(CustomRedisError::Timeout)
        ));
        assert!(matches!(
            client.ping().await,
            Err(CustomRedisError::Timeout)
        ));

        client.restore_connection();
        assert_eq!(client.get("k1".to_string()).await.unwrap(), "v1");
    }

    #[tokio::test]
    async fn test_incr_accumulates() {
        let client = MockRedisClient::new();
        assert_eq!(client.incr("views:1".to_string(), 1).await.unwrap(), 1);
        assert_eq!(client.incr("views:1".to_string(), 1).await.unwrap(), 2);
        assert_eq!(client.incr("views:2".to_string(), 1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_del_by_pattern_only_removes_matching_keys() {
        let client = MockRedisClient::new()
            .seed("items:a", "1")
            .seed("items:b", "2")
            .seed("orders:a", "3");

        let removed = client
            .del_by_pattern("items:*".to_string())
            .await
            .unwrap();

        assert_eq!(removed, 2);
        assert!(!client.contains_key("items:a"));
        assert!(!client.contains_key("items:b"));
        assert!(client.contains_key("orders:a"));
    }
}
