/// Module model and database operations
///
/// A module is a user-uploaded content package: an archive plus metadata and
/// up to four preview images (see [`super::image`]).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE modules (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     title TEXT NOT NULL,
///     description TEXT NOT NULL,
///     long_description TEXT,
///     author TEXT NOT NULL,
///     file_path TEXT NOT NULL,
///     user_id INTEGER NOT NULL REFERENCES users(id),
///     created_at TEXT NOT NULL
/// );
/// ```
///
/// `author` is a copy of the uploader's username taken at upload time. It is
/// not joined live, so renaming a user does not rewrite past modules.
///
/// Modules are immutable once created; there is no update or delete.

use chrono::{DateTime, Utc};
use crate::db;
use serde::{Deserialize, Serialize};
use sqlx::{Executor, Sqlite, SqlitePool};

/// Module row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Module {
    /// Unique numeric module ID
    pub id: i64,

    /// Title
    pub title: String,

    /// Short description shown in listings
    pub description: String,

    /// Optional long description shown on the detail page
    pub long_description: Option<String>,

    /// Uploader's username at upload time
    pub author: String,

    /// Reference path of the stored archive (`/uploads/<name>`)
    pub file_path: String,

    /// Owning user
    pub user_id: i64,

    /// When the module was uploaded
    pub created_at: DateTime<Utc>,
}

/// Input for creating a module
#[derive(Debug, Clone)]
pub struct CreateModule {
    pub title: String,
    pub description: String,
    pub long_description: Option<String>,
    pub author: String,
    pub file_path: String,
    pub user_id: i64,
}

const MODULE_COLUMNS: &str =
    "id, title, description, long_description, author, file_path, user_id, created_at";

impl Module {
    /// Inserts a module
    ///
    /// Takes any executor so the insert can join a transaction together with
    /// its images.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use modshare_shared::models::module::{Module, CreateModule};
    /// # use modshare_shared::models::image::Image;
    /// # use sqlx::SqlitePool;
    /// # async fn example(pool: SqlitePool) -> Result<(), sqlx::Error> {
    /// let mut tx = pool.begin().await?;
    /// let module = Module::create(&mut *tx, CreateModule {
    ///     title: "Dungeon".to_string(),
    ///     description: "short".to_string(),
    ///     long_description: None,
    ///     author: "alice".to_string(),
    ///     file_path: "/uploads/1-d.zip".to_string(),
    ///     user_id: 1,
    /// })
    /// .await?;
    /// Image::create(&mut *tx, module.id, "/uploads/2-shot.png").await?;
    /// tx.commit().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create<'e, E>(executor: E, data: CreateModule) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let query = format!(
            "INSERT INTO modules (title, description, long_description, author, file_path, user_id, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {MODULE_COLUMNS}"
        );

        sqlx::query_as::<_, Module>(&query)
            .bind(data.title)
            .bind(data.description)
            .bind(data.long_description)
            .bind(data.author)
            .bind(data.file_path)
            .bind(data.user_id)
            .bind(Utc::now())
            .fetch_all(executor)
            .await
            .and_then(db::returned_row)
    }

    /// Finds a module by ID
    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {MODULE_COLUMNS} FROM modules WHERE id = ?");

        sqlx::query_as::<_, Module>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists every module in insertion order
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!("SELECT {MODULE_COLUMNS} FROM modules ORDER BY id ASC");

        sqlx::query_as::<_, Module>(&query).fetch_all(pool).await
    }

    /// Lists a user's modules in insertion order
    pub async fn list_by_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let query =
            format!("SELECT {MODULE_COLUMNS} FROM modules WHERE user_id = ? ORDER BY id ASC");

        sqlx::query_as::<_, Module>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Fetches only the stored archive reference of a module
    pub async fn file_path_by_id(
        pool: &SqlitePool,
        id: i64,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT file_path FROM modules WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Counts all modules
    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM modules")
            .fetch_one(pool)
            .await
    }
}
