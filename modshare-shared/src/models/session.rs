/// Server-side session records
///
/// A session is created at login and identified by an opaque random ID that
/// travels in a signed cookie (see [`crate::auth::session`]). The row carries
/// the only identity a request ever gets: user ID and username.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE sessions (
///     id TEXT PRIMARY KEY,
///     user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     username TEXT NOT NULL,
///     created_at TEXT NOT NULL,
///     expires_at TEXT NOT NULL
/// );
/// ```
///
/// # Lifetime
///
/// `expires_at` is fixed at creation (`created_at + ttl`). Using a session
/// never extends it.

use chrono::{DateTime, Duration, Utc};
use crate::db;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

/// Session row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    /// Opaque session ID
    pub id: String,

    /// Authenticated user
    pub user_id: i64,

    /// Username at login time
    pub username: String,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// When the session stops being valid
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Checks if the session has expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Creates a session that expires `ttl` after now
    pub async fn create(
        pool: &SqlitePool,
        id: &str,
        user_id: i64,
        username: &str,
        ttl: Duration,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();

        sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, user_id, username, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, user_id, username, created_at, expires_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(username)
        .bind(now)
        .bind(now + ttl)
        .fetch_all(pool)
        .await
        .and_then(db::returned_row)
    }

    /// Finds a session that has not expired
    ///
    /// An expired row is deleted on sight and reported as absent.
    pub async fn find_active(pool: &SqlitePool, id: &str) -> Result<Option<Self>, sqlx::Error> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT id, user_id, username, created_at, expires_at FROM sessions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        match session {
            Some(session) if session.is_expired_at(Utc::now()) => {
                debug!(user_id = session.user_id, "Dropping expired session");
                Self::delete(pool, id).await?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    /// Deletes a session; deleting a missing session is not an error
    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes every expired session, returning how many were removed
    pub async fn delete_expired(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(Utc::now())
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
