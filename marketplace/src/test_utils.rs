use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::PgConnection;

pub fn random_string(prefix: &str, length: usize) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(Alphanumeric)
        .take(length)
        .map(char::from)
        .collect();
    format!("{}{}", prefix, suffix)
}

pub async fn insert_test_user(conn: &mut PgConnection) -> i32 {
    let username = random_string("user_", 12);
    sqlx::query_scalar::<_, i32>(
        "INSERT INTO users (username, email) VALUES ($1, $2) RETURNING id",
    )
    .bind(&username)
    .bind(format!("{username}@example.com"))
    .fetch_one(conn)
    .await
    .expect("failed to insert test user")
}

pub async fn insert_test_item(conn: &mut PgConnection, seller_id: i32, price: f64) -> i32 {
    sqlx::query_scalar::<_, i32>(
        "INSERT INTO items (name, description, price, seller_id) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(random_string("item_", 12))
    .bind(Option::<String>::None)
    .bind(price)
    .bind(seller_id)
    .fetch_one(conn)
    .await
    .expect("failed to insert test item")
}

pub async fn count_orders(conn: &mut PgConnection, user_id: i32) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(conn)
        .await
        .expect("failed to count orders")
}
