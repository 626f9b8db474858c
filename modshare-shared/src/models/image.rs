/// Module preview images
///
/// ```sql
/// CREATE TABLE images (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     module_id INTEGER NOT NULL REFERENCES modules(id) ON DELETE CASCADE,
///     file_path TEXT NOT NULL
/// );
/// ```

use crate::db;
use serde::{Deserialize, Serialize};
use sqlx::{Executor, Sqlite, SqlitePool};

/// Maximum number of images attached to one module
pub const MAX_IMAGES_PER_MODULE: usize = 4;

/// Image row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Image {
    pub id: i64,
    pub module_id: i64,
    pub file_path: String,
}

impl Image {
    /// Inserts one image for a module
    pub async fn create<'e, E>(
        executor: E,
        module_id: i64,
        file_path: &str,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Image>(
            "INSERT INTO images (module_id, file_path) VALUES (?, ?) \
             RETURNING id, module_id, file_path",
        )
        .bind(module_id)
        .bind(file_path)
        .fetch_all(executor)
        .await
        .and_then(db::returned_row)
    }

    /// Lists the reference paths of a module's images
    pub async fn paths_by_module(
        pool: &SqlitePool,
        module_id: i64,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT file_path FROM images WHERE module_id = ? ORDER BY id ASC")
            .bind(module_id)
            .fetch_all(pool)
            .await
    }

    /// Counts every stored image
    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM images")
            .fetch_one(pool)
            .await
    }
}
