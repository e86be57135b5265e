use std::future::ready;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use common_cache::CacheAside;
use common_database::DatabaseClient;
use common_redis::Client as RedisClient;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::endpoints;
use crate::prometheus::{setup_metrics_recorder, track_metrics};

#[derive(Clone)]
pub struct State {
    pub db: Arc<DatabaseClient>,
    pub redis: Arc<dyn RedisClient + Send + Sync>,
    pub items_cache: Arc<CacheAside>,
    pub config: Config,
}

pub fn router(
    db: Arc<DatabaseClient>,
    redis: Arc<dyn RedisClient + Send + Sync>,
    items_cache: Arc<CacheAside>,
    config: Config,
) -> Router {
    let enable_metrics = config.enable_metrics;

    let state = State {
        db,
        redis,
        items_cache,
        config,
    };

    let status_router = Router::new()
        .route("/", get(endpoints::index))
        .route("/health", get(endpoints::health));

    let api_router = Router::new()
        .route("/users", get(endpoints::list_users))
        .route("/users/:user_id", get(endpoints::get_user))
        .route("/items", get(endpoints::list_items))
        .route("/items/:item_id", get(endpoints::get_item))
        .route(
            "/orders",
            get(endpoints::list_orders).post(endpoints::create_order),
        )
        .route("/slow", get(endpoints::slow));

    let router = Router::new()
        .merge(status_router)
        .merge(api_router)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(track_metrics))
        .with_state(state);

    // Don't install metrics unless asked to
    // Global metrics recorders can play poorly with e.g. tests
    if enable_metrics {
        let recorder_handle = setup_metrics_recorder();
        router.route("/metrics", get(move || ready(recorder_handle.render())))
    } else {
        router
    }
}
