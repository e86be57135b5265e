use chrono::{DateTime, Utc};
use common_database::{DatabaseClient, DatabaseError};
use metrics::counter;
use serde::Serialize;

use crate::items::Item;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A user together with the items they have listed for sale.
#[derive(Debug, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub items: Vec<Item>,
}

impl User {
    pub async fn list(db: &DatabaseClient) -> Result<Vec<User>, DatabaseError> {
        let mut conn = db.connect().await?;
        counter!("db_queries_total", "query" => "list_users").increment(1);

        sqlx::query_as::<_, User>("SELECT id, username, email, created_at FROM users ORDER BY id")
            .fetch_all(&mut conn)
            .await
            .map_err(|error| DatabaseError::query("list_users", error))
    }

    pub async fn find_with_items(
        db: &DatabaseClient,
        user_id: i32,
    ) -> Result<Option<UserDetail>, DatabaseError> {
        let mut conn = db.connect().await?;
        counter!("db_queries_total", "query" => "get_user").increment(1);

        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&mut conn)
        .await
        .map_err(|error| DatabaseError::query("get_user", error))?;

        let Some(user) = user else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, Item>(
            "SELECT id, name, description, price, seller_id FROM items WHERE seller_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&mut conn)
        .await
        .map_err(|error| DatabaseError::query("get_user_items", error))?;

        Ok(Some(UserDetail { user, items }))
    }

    pub async fn count(db: &DatabaseClient) -> Result<i64, DatabaseError> {
        let mut conn = db.connect().await?;
        counter!("db_queries_total", "query" => "count_users").increment(1);

        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&mut conn)
            .await
            .map_err(|error| DatabaseError::query("count_users", error))
    }
}
