use std::time::Duration;

use sqlx::{Connection, Error as SqlxError, PgConnection};
use thiserror::Error;

/// How many times to try opening a session before giving up.
pub const CONNECT_ATTEMPTS: u32 = 3;
/// Pause between connection attempts.
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("connection failed with: {error}")]
    ConnectionError { error: SqlxError },
    #[error("{command} query failed with: {error}")]
    QueryError { command: String, error: SqlxError },
}

impl DatabaseError {
    pub fn query(command: impl Into<String>, error: SqlxError) -> Self {
        DatabaseError::QueryError {
            command: command.into(),
            error,
        }
    }
}

/// Hands out short-lived postgres sessions. Each operation opens its own
/// connection and drops it when done; there is no pool, so a slow query can
/// never starve unrelated requests of connections.
pub struct DatabaseClient {
    url: String,
}

impl DatabaseClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Open a session, retrying up to [`CONNECT_ATTEMPTS`] times with
    /// [`CONNECT_RETRY_DELAY`] between attempts. Only the final failure is
    /// surfaced to the caller.
    pub async fn connect(&self) -> Result<PgConnection, DatabaseError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match PgConnection::connect(&self.url).await {
                Ok(conn) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "database connection established after retry");
                    }
                    return Ok(conn);
                }
                Err(error) if attempt < CONNECT_ATTEMPTS => {
                    tracing::warn!(attempt, %error, "database connection failed, retrying");
                    tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                }
                Err(error) => {
                    tracing::error!(attempt, %error, "database connection failed, giving up");
                    return Err(DatabaseError::ConnectionError { error });
                }
            }
        }
    }

    /// Single connection attempt plus a trivial query, with no retries.
    /// Health probes want the current truth, not an eventually-successful
    /// answer.
    pub async fn ping(&self) -> Result<(), DatabaseError> {
        let mut conn = PgConnection::connect(&self.url)
            .await
            .map_err(|error| DatabaseError::ConnectionError { error })?;

        sqlx::query("SELECT 1")
            .execute(&mut conn)
            .await
            .map_err(|error| DatabaseError::query("SELECT 1", error))?;

        Ok(())
    }
}

/// Determines if a sqlx::Error represents a foreign key constraint violation
pub fn is_foreign_key_constraint_error(error: &SqlxError) -> bool {
    match error {
        SqlxError::Database(db_error) => {
            // Class 23 — Integrity Constraint Violation; 23503 = foreign_key_violation
            // See: https://www.postgresql.org/docs/current/errcodes-appendix.html
            if let Some(code) = db_error.code() {
                code.as_ref() == "23503"
            } else {
                let msg = db_error.message().to_lowercase();
                msg.contains("violates foreign key constraint")
                    || msg.contains("foreign key constraint")
            }
        }
        _ => false,
    }
}
