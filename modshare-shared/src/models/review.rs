/// Review model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE reviews (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     module_id INTEGER NOT NULL REFERENCES modules(id) ON DELETE CASCADE,
///     user_id INTEGER NOT NULL REFERENCES users(id),
///     rating REAL NOT NULL CHECK (rating >= 0.5 AND rating <= 5.0),
///     review_text TEXT,
///     created_at TEXT NOT NULL,
///     UNIQUE (module_id, user_id)
/// );
/// ```
///
/// # Invariants
///
/// - At most one review per (module, user). The UNIQUE constraint enforces
///   it; [`Review::create`] returns the violation as a database error.
/// - Ratings are on a half-point scale from 0.5 to 5.0 inclusive. Callers
///   check with [`validate_rating`] before inserting; the CHECK constraint
///   only backs up the range.
/// - The average rating is derived on read and never stored.

use chrono::{DateTime, Utc};
use crate::db;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Lowest accepted rating
pub const MIN_RATING: f64 = 0.5;

/// Highest accepted rating
pub const MAX_RATING: f64 = 5.0;

/// Review row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: i64,
    pub module_id: i64,
    pub user_id: i64,
    pub rating: f64,
    pub review_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Review joined with the reviewer's public identity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReviewWithAuthor {
    pub id: i64,
    pub module_id: i64,
    pub user_id: i64,
    pub rating: f64,
    pub review_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub username: String,
    pub profile_picture: Option<String>,
}

/// Input for creating a review
#[derive(Debug, Clone)]
pub struct CreateReview {
    pub module_id: i64,
    pub user_id: i64,
    pub rating: f64,
    pub review_text: Option<String>,
}

/// Derived rating aggregate for one module
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RatingSummary {
    /// Arithmetic mean, `None` when the module has no reviews
    pub average: Option<f64>,

    /// Number of reviews
    pub count: i64,
}

/// Checks that a rating lies in [0.5, 5.0] on a half-point step
///
/// # Example
///
/// ```
/// use modshare_shared::models::review::validate_rating;
///
/// assert!(validate_rating(0.5).is_ok());
/// assert!(validate_rating(3.5).is_ok());
/// assert!(validate_rating(0.3).is_err());
/// assert!(validate_rating(4.25).is_err());
/// assert!(validate_rating(5.5).is_err());
/// ```
pub fn validate_rating(rating: f64) -> Result<(), String> {
    if !rating.is_finite() || !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(format!(
            "Rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        ));
    }

    // Half steps are exact in binary floating point, so doubling must land on
    // an integer.
    if (rating * 2.0).fract() != 0.0 {
        return Err("Rating must be a multiple of 0.5".to_string());
    }

    Ok(())
}

impl Review {
    /// Inserts a review
    ///
    /// # Errors
    ///
    /// - unique violation: the user already reviewed this module
    /// - foreign key violation: the module (or user) does not exist
    pub async fn create(pool: &SqlitePool, data: CreateReview) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (module_id, user_id, rating, review_text, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, module_id, user_id, rating, review_text, created_at
            "#,
        )
        .bind(data.module_id)
        .bind(data.user_id)
        .bind(data.rating)
        .bind(data.review_text)
        .bind(Utc::now())
        .fetch_all(pool)
        .await
        .and_then(db::returned_row)
    }

    /// Finds the review a user left on a module
    pub async fn find_by_module_and_user(
        pool: &SqlitePool,
        module_id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Review>(
            r#"
            SELECT id, module_id, user_id, rating, review_text, created_at
            FROM reviews
            WHERE module_id = ? AND user_id = ?
            "#,
        )
        .bind(module_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Lists a module's reviews with reviewer info, newest first
    pub async fn list_by_module(
        pool: &SqlitePool,
        module_id: i64,
    ) -> Result<Vec<ReviewWithAuthor>, sqlx::Error> {
        sqlx::query_as::<_, ReviewWithAuthor>(
            r#"
            SELECT r.id, r.module_id, r.user_id, r.rating, r.review_text, r.created_at,
                   u.username, u.profile_picture
            FROM reviews r
            JOIN users u ON r.user_id = u.id
            WHERE r.module_id = ?
            ORDER BY r.created_at DESC, r.id DESC
            "#,
        )
        .bind(module_id)
        .fetch_all(pool)
        .await
    }

    /// Computes the rating aggregate of a module
    pub async fn rating_summary(
        pool: &SqlitePool,
        module_id: i64,
    ) -> Result<RatingSummary, sqlx::Error> {
        sqlx::query_as::<_, RatingSummary>(
            "SELECT AVG(rating) AS average, COUNT(*) AS count FROM reviews WHERE module_id = ?",
        )
        .bind(module_id)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rating_bounds() {
        assert!(validate_rating(0.5).is_ok());
        assert!(validate_rating(5.0).is_ok());
        assert!(validate_rating(0.3).is_err());
        assert!(validate_rating(5.5).is_err());
        assert!(validate_rating(0.0).is_err());
        assert!(validate_rating(-1.0).is_err());
    }

    #[test]
    fn test_validate_rating_steps() {
        for ok in [1.0, 1.5, 2.0, 2.5, 3.0, 4.5] {
            assert!(validate_rating(ok).is_ok(), "{} should be accepted", ok);
        }
        let err = validate_rating(2.7).unwrap_err();
        assert!(err.contains("multiple of 0.5"));
    }

    #[test]
    fn test_validate_rating_non_finite() {
        assert!(validate_rating(f64::NAN).is_err());
        assert!(validate_rating(f64::INFINITY).is_err());
    }
}
