use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common_database::DatabaseClient;
use common_redis::Client as RedisClient;
use serde::ser::Serializer;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyStatus {
    Healthy,
    Unhealthy(String),
}

impl Serialize for DependencyStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            DependencyStatus::Healthy => serializer.serialize_str("healthy"),
            DependencyStatus::Unhealthy(reason) => {
                serializer.serialize_str(&format!("unhealthy: {reason}"))
            }
        }
    }
}

/// Aggregate of one probe round. `status` is "healthy" only when every
/// dependency answered; otherwise "degraded".
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub checks: HashMap<&'static str, DependencyStatus>,
}

impl HealthReport {
    pub fn from_checks(postgres: DependencyStatus, redis: DependencyStatus) -> Self {
        let all_healthy =
            postgres == DependencyStatus::Healthy && redis == DependencyStatus::Healthy;
        Self {
            status: if all_healthy { "healthy" } else { "degraded" },
            checks: HashMap::from([("postgres", postgres), ("redis", redis)]),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

impl IntoResponse for HealthReport {
    fn into_response(self) -> Response {
        let code = if self.is_healthy() {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        (code, Json(self)).into_response()
    }
}

/// Probe every dependency right now. Both probes are single-shot (no
/// retries) and run concurrently; one failing never masks the other.
pub async fn probe(
    db: &DatabaseClient,
    redis: &Arc<dyn RedisClient + Send + Sync>,
) -> HealthReport {
    let (postgres, redis_status) = tokio::join!(db.ping(), redis.ping());

    HealthReport::from_checks(
        postgres.map_or_else(
            |e| DependencyStatus::Unhealthy(e.to_string()),
            |_| DependencyStatus::Healthy,
        ),
        redis_status.map_or_else(
            |e| DependencyStatus::Unhealthy(e.to_string()),
            |_| DependencyStatus::Healthy,
        ),
    )
}
