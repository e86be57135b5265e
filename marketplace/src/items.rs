use common_cache::{CacheAside, CacheResult};
use common_database::{DatabaseClient, DatabaseError};
use common_redis::Client as RedisClient;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cache namespace for item listings; order creation invalidates the whole
/// namespace.
pub const ITEMS_CACHE_NAMESPACE: &str = "items";

/// Redis key prefix for per-item view counters.
const VIEW_COUNT_PREFIX: &str = "item_views";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Item {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub seller_id: i32,
}

/// An item plus its view counter.
#[derive(Debug, Serialize)]
pub struct ItemDetail {
    #[serde(flatten)]
    pub item: Item,
    pub views: i64,
}

/// List all items, served from cache when possible.
pub async fn list_items(
    db: &DatabaseClient,
    cache: &CacheAside,
) -> Result<CacheResult<Vec<Item>>, DatabaseError> {
    cache
        .get_or_produce("list", &[], || async { fetch_items(db).await })
        .await
}

async fn fetch_items(db: &DatabaseClient) -> Result<Vec<Item>, DatabaseError> {
    let mut conn = db.connect().await?;
    counter!("db_queries_total", "query" => "list_items").increment(1);

    sqlx::query_as::<_, Item>(
        "SELECT id, name, description, price, seller_id FROM items ORDER BY id",
    )
    .fetch_all(&mut conn)
    .await
    .map_err(|error| DatabaseError::query("list_items", error))
}

pub async fn get_item(
    db: &DatabaseClient,
    redis: &Arc<dyn RedisClient + Send + Sync>,
    item_id: i32,
) -> Result<Option<ItemDetail>, DatabaseError> {
    let mut conn = db.connect().await?;
    counter!("db_queries_total", "query" => "get_item").increment(1);

    let item = sqlx::query_as::<_, Item>(
        "SELECT id, name, description, price, seller_id FROM items WHERE id = $1",
    )
    .bind(item_id)
    .fetch_one(&mut conn)
    .await;

    match item {
        Ok(item) => {
            let views = record_view(redis, item_id).await;
            Ok(Some(ItemDetail { item, views }))
        }
        Err(sqlx::Error::RowNotFound) => Ok(None),
        Err(error) => Err(DatabaseError::query("get_item", error)),
    }
}

/// Bump and return the item's view counter. The counter is nice-to-have:
/// when redis is down we report 0 rather than failing the page.
pub async fn record_view(redis: &Arc<dyn RedisClient + Send + Sync>, item_id: i32) -> i64 {
    match redis.incr(format!("{VIEW_COUNT_PREFIX}:{item_id}"), 1).await {
        Ok(views) => views,
        Err(err) => {
            tracing::warn!(item_id, %err, "view counter unavailable");
            counter!(
                "cache_operations_total",
                "namespace" => VIEW_COUNT_PREFIX,
                "operation" => "incr",
                "result" => "error",
            )
            .increment(1);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_redis::MockRedisClient;

    #[tokio::test]
    async fn test_record_view_counts_up() {
        let redis: Arc<dyn RedisClient + Send + Sync> = Arc::new(MockRedisClient::new());

        assert_eq!(record_view(&redis, 7).await, 1);
        assert_eq!(record_view(&redis, 7).await, 2);
        assert_eq!(record_view(&redis, 8).await, 1);
    }

    #[tokio::test]
    async fn test_record_view_returns_zero_when_redis_is_down() {
        let mut mock = MockRedisClient::new();
        mock.break_connection();
        let redis: Arc<dyn RedisClient + Send + Sync> = Arc::new(mock);

        assert_eq!(record_view(&redis, 7).await, 0);
    }
}
