/// Database layer for modshare
///
/// # Modules
///
/// - `pool`: SQLite connection pool management with health checks
/// - `migrations`: Embedded schema migrations
/// - Models are in the `models` module at crate root level
///
/// Uniqueness (usernames, one review per user and module) is enforced by the
/// schema. Callers detect violations from the error the store returns with
/// [`is_unique_violation`] instead of checking first and inserting second.

pub mod migrations;
pub mod pool;

/// Takes the single row of a drained `INSERT/UPDATE ... RETURNING`
///
/// Writes with `RETURNING` go through `fetch_all` so the statement runs to
/// completion, and an autocommit write is committed, before the row is handed
/// back. `fetch_one` stops after the first row and can leave the write pending
/// while other pooled connections read.
pub fn returned_row<T>(rows: Vec<T>) -> Result<T, sqlx::Error> {
    rows.into_iter().next().ok_or(sqlx::Error::RowNotFound)
}

/// Returns true when `err` is a UNIQUE or PRIMARY KEY constraint violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

/// Returns true when `err` is a FOREIGN KEY constraint violation
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_foreign_key_violation(),
        _ => false,
    }
}
