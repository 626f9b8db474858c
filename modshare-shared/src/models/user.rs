/// User model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     username TEXT NOT NULL UNIQUE,
///     password_hash TEXT NOT NULL,
///     bio TEXT,
///     profile_picture TEXT,
///     created_at TEXT NOT NULL
/// );
/// ```
///
/// Usernames match case-sensitively. The UNIQUE constraint is the only
/// duplicate check: [`User::create`] surfaces the violation as a
/// `sqlx::Error` and callers map it with `db::is_unique_violation`.
///
/// # Example
///
/// ```no_run
/// use modshare_shared::models::user::{User, CreateUser};
/// use sqlx::SqlitePool;
///
/// # async fn example(pool: SqlitePool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     username: "alice".to_string(),
///     password_hash: "$argon2id$...".to_string(),
/// })
/// .await?;
///
/// let found = User::find_by_username(&pool, "alice").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use crate::db;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// User account
///
/// Passwords are stored as Argon2id hashes, never in plaintext, and the hash
/// is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique numeric user ID
    pub id: i64,

    /// Unique username
    pub username: String,

    /// Argon2id password hash (PHC string)
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Optional free-text bio
    pub bio: Option<String>,

    /// Optional reference path of the profile picture (`/uploads/...`)
    pub profile_picture: Option<String>,

    /// When the account was created
    pub created_at: DateTime<Utc>,
}

/// Public view of a user, safe to return to any client
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            bio: user.bio,
            profile_picture: user.profile_picture,
        }
    }
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    /// Username (must be unique)
    pub username: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,
}

/// Partial profile update
///
/// Only `Some` fields are written. An empty bio is a value, not an absence.
#[derive(Debug, Clone, Default)]
pub struct UpdateProfile {
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}

impl UpdateProfile {
    /// True when no field would be written
    pub fn is_empty(&self) -> bool {
        self.bio.is_none() && self.profile_picture.is_none()
    }
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns a database error carrying a unique violation when the username
    /// is taken.
    pub async fn create(pool: &SqlitePool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let rows = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, created_at)
            VALUES (?, ?, ?)
            RETURNING id, username, password_hash, bio, profile_picture, created_at
            "#,
        )
        .bind(data.username)
        .bind(data.password_hash)
        .bind(Utc::now())
        .fetch_all(pool)
        .await?;

        db::returned_row(rows)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, bio, profile_picture, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by exact (case-sensitive) username
    pub async fn find_by_username(
        pool: &SqlitePool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, bio, profile_picture, created_at
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Applies a partial profile update
    ///
    /// Returns the updated user, or `None` if the user does not exist. An empty
    /// update performs no write and returns the current row.
    pub async fn update_profile(
        pool: &SqlitePool,
        id: i64,
        data: UpdateProfile,
    ) -> Result<Option<Self>, sqlx::Error> {
        if data.is_empty() {
            return Self::find_by_id(pool, id).await;
        }

        let mut assignments = Vec::new();
        if data.bio.is_some() {
            assignments.push("bio = ?");
        }
        if data.profile_picture.is_some() {
            assignments.push("profile_picture = ?");
        }

        let query = format!(
            "UPDATE users SET {} WHERE id = ? \
             RETURNING id, username, password_hash, bio, profile_picture, created_at",
            assignments.join(", ")
        );

        let mut q = sqlx::query_as::<_, User>(&query);
        if let Some(bio) = data.bio {
            q = q.bind(bio);
        }
        if let Some(picture) = data.profile_picture {
            q = q.bind(picture);
        }

        let rows = q.bind(id).fetch_all(pool).await?;

        Ok(rows.into_iter().next())
    }

    /// Replaces the stored password hash
    ///
    /// Returns false when the user does not exist.
    pub async fn update_password(
        pool: &SqlitePool,
        id: i64,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts users with the given username (0 or 1)
    pub async fn count_by_username(pool: &SqlitePool, username: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: 7,
            username: "alice".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            bio: Some("hello".to_string()),
            profile_picture: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "alice");
    }

    #[test]
    fn test_public_user_from_user() {
        let public = PublicUser::from(sample_user());
        assert_eq!(public.id, 7);
        assert_eq!(public.bio.as_deref(), Some("hello"));
    }

    #[test]
    fn test_update_profile_is_empty() {
        assert!(UpdateProfile::default().is_empty());
        assert!(!UpdateProfile {
            bio: Some(String::new()),
            ..Default::default()
        }
        .is_empty());
    }
}
