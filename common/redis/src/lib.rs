use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum CustomRedisError {
    #[error("Not found in redis")]
    NotFound,
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Timeout error")]
    Timeout,
    #[error(transparent)]
    Redis(#[from] Arc<redis::RedisError>),
}

impl From<redis::RedisError> for CustomRedisError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            CustomRedisError::Timeout
        } else {
            CustomRedisError::Redis(Arc::new(err))
        }
    }
}

/// The subset of redis commands the services need. Every method returns a
/// `CustomRedisError` so callers can decide whether the failure is a plain
/// miss (`NotFound`) or an infrastructure problem they should degrade around.
#[async_trait]
pub trait Client {
    async fn get(&self, k: String) -> Result<String, CustomRedisError>;
    async fn setex(&self, k: String, v: String, seconds: u64) -> Result<(), CustomRedisError>;
    async fn incr(&self, k: String, by: i64) -> Result<i64, CustomRedisError>;
    async fn del(&self, k: String) -> Result<(), CustomRedisError>;

    /// Delete every key matching the glob-style pattern, returning how many
    /// keys were removed.
    async fn del_by_pattern(&self, pattern: String) -> Result<u64, CustomRedisError>;

    async fn ping(&self) -> Result<(), CustomRedisError>;
}

mod client;
mod mock;

pub use client::RedisClient;
pub use mock::{MockRedisCall, MockRedisClient, MockRedisValue};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_errors_map_to_timeout_variant() {
        let err = redis::RedisError::from((redis::ErrorKind::IoError, "timed out"));
        // Not flagged as timeout by the redis crate, stays a Redis error
        let custom: CustomRedisError = err.into();
        assert!(matches!(custom, CustomRedisError::Redis(_)));
    }

    #[test]
    fn test_not_found_is_distinct_from_infrastructure_errors() {
        let miss = CustomRedisError::NotFound;
        assert!(matches!(miss, CustomRedisError::NotFound));
        assert_eq!(miss.to_string(), "Not found in redis");
    }
}
