use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use metrics::counter;
use rand::Rng;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::instrument;

use crate::api::ApiError;
use crate::health::{self, HealthReport};
use crate::items::{self, Item, ItemDetail};
use crate::orders::{self, CreateOrderRequest, Order, OrderReceipt};
use crate::router;
use crate::users::{User, UserDetail};

pub async fn index() -> &'static str {
    "marketplace api"
}

/// Fresh composite probe of postgres and redis. Never cached.
#[instrument(skip_all)]
pub async fn health(State(state): State<router::State>) -> HealthReport {
    health::probe(&state.db, &state.redis).await
}

#[instrument(skip_all)]
pub async fn list_users(State(state): State<router::State>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(User::list(&state.db).await?))
}

#[instrument(skip_all, fields(user_id))]
pub async fn get_user(
    State(state): State<router::State>,
    Path(user_id): Path<i32>,
) -> Result<Json<UserDetail>, ApiError> {
    User::find_with_items(&state.db, user_id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("user"))
}

#[instrument(skip_all, fields(cache_source = tracing::field::Empty))]
pub async fn list_items(State(state): State<router::State>) -> Result<Json<Vec<Item>>, ApiError> {
    let result = items::list_items(&state.db, &state.items_cache).await?;
    tracing::Span::current().record("cache_source", result.source.to_string().as_str());
    Ok(Json(result.value))
}

#[instrument(skip_all, fields(item_id))]
pub async fn get_item(
    State(state): State<router::State>,
    Path(item_id): Path<i32>,
) -> Result<Json<ItemDetail>, ApiError> {
    items::get_item(&state.db, &state.redis, item_id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("item"))
}

#[instrument(skip_all)]
pub async fn list_orders(State(state): State<router::State>) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(orders::list_orders(&state.db).await?))
}

#[instrument(skip_all, fields(user_id = request.user_id, item_count = request.item_ids.len()))]
pub async fn create_order(
    State(state): State<router::State>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderReceipt>), ApiError> {
    let receipt = orders::create_order(&state.db, &state.items_cache, request).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Deliberately slow endpoint mixing cache reads, database queries and an
/// artificial delay. Exists to give tracing something interesting to show.
#[instrument(skip_all)]
pub async fn slow(State(state): State<router::State>) -> Result<Json<Value>, ApiError> {
    counter!("slow_requests_total").increment(1);

    let delay_ms: u64 = rand::thread_rng().gen_range(300..800);
    let listed = items::list_items(&state.db, &state.items_cache).await?;
    let user_count = User::count(&state.db).await?;

    tokio::time::sleep(Duration::from_millis(delay_ms)).await;

    Ok(Json(json!({
        "delay_ms": delay_ms,
        "item_count": listed.value.len(),
        "user_count": user_count,
    })))
}
