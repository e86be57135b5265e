use chrono::{DateTime, Utc};
use common_cache::CacheAside;
use common_database::{is_foreign_key_constraint_error, DatabaseClient, DatabaseError};
use metrics::counter;
use serde::{Deserialize, Serialize};
use sqlx::{Connection, PgConnection, Postgres, Transaction};

use crate::api::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: i32,
    pub item_ids: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: i32,
    pub user_id: i32,
    pub total: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// What the caller gets back after placing an order: the stored row plus the
/// item ids in the order they were requested.
#[derive(Debug, Serialize)]
pub struct OrderReceipt {
    #[serde(flatten)]
    pub order: Order,
    pub item_ids: Vec<i32>,
}

fn validate(request: &CreateOrderRequest) -> Result<(), ApiError> {
    if request.user_id <= 0 {
        return Err(ApiError::Validation(
            "user_id must be a positive integer".to_string(),
        ));
    }
    if request.item_ids.is_empty() {
        return Err(ApiError::Validation(
            "item_ids must not be empty".to_string(),
        ));
    }
    if request.item_ids.iter().any(|id| *id <= 0) {
        return Err(ApiError::Validation(
            "item_ids must be positive integers".to_string(),
        ));
    }
    Ok(())
}

/// Place an order: price the requested items, write the order and its lines
/// in one transaction, then drop the cached item listings so the next read
/// sees fresh data.
///
/// The invalidation runs strictly after commit and is best-effort; a failure
/// there is logged but the order still succeeds.
pub async fn create_order(
    db: &DatabaseClient,
    items_cache: &CacheAside,
    request: CreateOrderRequest,
) -> Result<OrderReceipt, ApiError> {
    validate(&request)?;

    let mut conn: PgConnection = db.connect().await?;
    let mut tx = conn
        .begin()
        .await
        .map_err(|error| DatabaseError::query("BEGIN", error))?;

    let receipt = match insert_order(&mut tx, &request).await {
        Ok(receipt) => {
            tx.commit()
                .await
                .map_err(|error| DatabaseError::query("COMMIT", error))?;
            receipt
        }
        Err(error) => {
            if let Err(rollback_error) = tx.rollback().await {
                tracing::warn!(%rollback_error, "order rollback failed");
            }
            return Err(error.into());
        }
    };

    counter!("orders_created_total").increment(1);

    // Happens after commit: readers either see the old listing or recompute
    // the new one, never a cached value from inside the transaction.
    items_cache.invalidate().await;

    Ok(receipt)
}

async fn insert_order(
    tx: &mut Transaction<'_, Postgres>,
    request: &CreateOrderRequest,
) -> Result<OrderReceipt, DatabaseError> {
    counter!("db_queries_total", "query" => "create_order").increment(1);

    // Items missing from the table contribute nothing to the total; the
    // foreign key on order_items is what rejects them.
    let total: Option<f64> = sqlx::query_scalar("SELECT SUM(price) FROM items WHERE id = ANY($1)")
        .bind(&request.item_ids)
        .fetch_one(&mut **tx)
        .await
        .map_err(|error| DatabaseError::query("sum_item_prices", error))?;
    let total = total.unwrap_or(0.0);

    let order = sqlx::query_as::<_, Order>(
        "INSERT INTO orders (user_id, total, status) VALUES ($1, $2, 'pending') \
         RETURNING id, user_id, total, status, created_at",
    )
    .bind(request.user_id)
    .bind(total)
    .fetch_one(&mut **tx)
    .await
    .map_err(|error| DatabaseError::query("insert_order", error))?;

    for item_id in &request.item_ids {
        sqlx::query("INSERT INTO order_items (order_id, item_id) VALUES ($1, $2)")
            .bind(order.id)
            .bind(item_id)
            .execute(&mut **tx)
            .await
            .map_err(|error| {
                if is_foreign_key_constraint_error(&error) {
                    tracing::error!(item_id, order_id = order.id, "order references unknown item");
                }
                DatabaseError::query("insert_order_item", error)
            })?;
    }

    Ok(OrderReceipt {
        order,
        item_ids: request.item_ids.clone(),
    })
}

pub async fn list_orders(db: &DatabaseClient) -> Result<Vec<Order>, DatabaseError> {
    let mut conn = db.connect().await?;
    counter!("db_queries_total", "query" => "list_orders").increment(1);

    sqlx::query_as::<_, Order>(
        "SELECT id, user_id, total, status, created_at FROM orders ORDER BY created_at DESC LIMIT 100",
    )
    .fetch_all(&mut conn)
    .await
    .map_err(|error| DatabaseError::query("list_orders", error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_empty_item_list() {
        let err = validate(&CreateOrderRequest {
            user_id: 1,
            item_ids: vec![],
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_validate_rejects_non_positive_user() {
        for user_id in [0, -3] {
            let err = validate(&CreateOrderRequest {
                user_id,
                item_ids: vec![1],
            })
            .unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)), "user_id={user_id}");
        }
    }

    #[test]
    fn test_validate_rejects_non_positive_item_ids() {
        let err = validate(&CreateOrderRequest {
            user_id: 1,
            item_ids: vec![1, 0],
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_validate_accepts_well_formed_request() {
        assert!(validate(&CreateOrderRequest {
            user_id: 1,
            item_ids: vec![1, 2, 2],
        })
        .is_ok());
    }
}
