use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common_database::DatabaseError;
use serde::Serialize;
use thiserror::Error;

/// Everything a handler can fail with. Cache problems never show up here:
/// the cache layer degrades to the database instead of erroring.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Machine-readable error payload; `error` is a stable category, `detail` is
/// for humans.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub detail: String,
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::NotFound(_) => "not_found",
            ApiError::Database(DatabaseError::ConnectionError { .. }) => "connection_error",
            ApiError::Database(DatabaseError::QueryError { .. }) => "query_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Database(DatabaseError::ConnectionError { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Database(DatabaseError::QueryError { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, kind = self.kind(), "request failed");
        }

        let body = ErrorResponse {
            error: self.kind(),
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Error as SqlxError;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err = ApiError::Validation("item_ids must not be empty".to_string());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), "validation_error");
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let err = ApiError::NotFound("item");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "item not found");
    }

    #[test]
    fn test_connection_errors_map_to_service_unavailable() {
        let err = ApiError::Database(DatabaseError::ConnectionError {
            error: SqlxError::PoolClosed,
        });
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.kind(), "connection_error");
    }

    #[test]
    fn test_query_errors_map_to_internal_server_error() {
        let err = ApiError::Database(DatabaseError::query("insert_order", SqlxError::RowNotFound));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.kind(), "query_error");
    }
}
