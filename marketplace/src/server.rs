use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use common_cache::{CacheAside, CacheConfig};
use common_database::DatabaseClient;
use common_redis::{Client, RedisClient};
use tokio::net::TcpListener;

use crate::config::Config;
use crate::items::ITEMS_CACHE_NAMESPACE;
use crate::router;

pub async fn serve<F>(config: Config, listener: TcpListener, shutdown: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let redis_client: Arc<dyn Client + Send + Sync> =
        match RedisClient::new(config.redis_url.clone()).await {
            Ok(client) => Arc::new(client),
            Err(e) => {
                tracing::error!(
                    "Failed to create Redis client for URL {}: {}",
                    config.redis_url,
                    e
                );
                return;
            }
        };

    let db = Arc::new(DatabaseClient::new(config.database_url.clone()));

    if let Err(e) = run_migrations(&db).await {
        tracing::error!("Failed to run database migrations: {}", e);
        return;
    }

    let items_cache = Arc::new(CacheAside::new(
        redis_client.clone(),
        CacheConfig::with_ttl(ITEMS_CACHE_NAMESPACE, config.items_cache_ttl_seconds),
    ));

    let app = router::router(db, redis_client, items_cache, config);

    tracing::info!("listening on {:?}", listener.local_addr().unwrap());
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .unwrap()
}

async fn run_migrations(db: &DatabaseClient) -> anyhow::Result<()> {
    let mut conn = db.connect().await?;
    sqlx::migrate!("./migrations").run(&mut conn).await?;
    tracing::info!("database migrations applied");
    Ok(())
}
