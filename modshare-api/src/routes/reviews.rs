/// Review endpoints
///
/// - `POST /api/reviews` - Rate a module (one review per user per module)
/// - `GET /api/modules/:id/reviews` - Reviews of a module, newest first

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::auth::MessageResponse,
};
use axum::{
    extract::{Path, State},
    Json,
};
use modshare_shared::{
    auth::middleware::AuthContext,
    db,
    models::review::{validate_rating, CreateReview, Review, ReviewWithAuthor},
};
use serde::Deserialize;

/// Review submission
#[derive(Debug, Deserialize)]
pub struct SubmitReviewRequest {
    #[serde(default)]
    pub module_id: Option<i64>,

    #[serde(default)]
    pub rating: Option<f64>,

    #[serde(default)]
    pub review_text: Option<String>,
}

/// Submit a review
///
/// # Endpoint
///
/// ```text
/// POST /api/reviews
/// Content-Type: application/json
///
/// { "module_id": 7, "rating": 4.5, "review_text": "Great dungeon" }
/// ```
///
/// # Response
///
/// ```json
/// { "message": "Review submitted" }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Not logged in
/// - `400 Bad Request`: Missing module ID or rating, rating outside 0.5..=5
///   or not a multiple of 0.5
/// - `404 Not Found`: Module not found
/// - `409 Conflict`: You have already reviewed this module
pub async fn submit_review(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<SubmitReviewRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let (Some(module_id), Some(rating)) = (req.module_id, req.rating) else {
        return Err(ApiError::BadRequest(
            "Module ID and rating required".to_string(),
        ));
    };

    validate_rating(rating).map_err(|message| ApiError::invalid_field("rating", message))?;

    let review_text = req
        .review_text
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty());

    Review::create(
        &state.db,
        CreateReview {
            module_id,
            user_id: auth.user_id,
            rating,
            review_text,
        },
    )
    .await
    .map_err(|e| {
        if db::is_unique_violation(&e) {
            ApiError::Conflict("You have already reviewed this module".to_string())
        } else if db::is_foreign_key_violation(&e) {
            ApiError::NotFound("Module not found".to_string())
        } else {
            e.into()
        }
    })?;

    tracing::info!(module_id, user_id = auth.user_id, rating, "Review submitted");

    Ok(Json(MessageResponse::new("Review submitted")))
}

/// Reviews of a module
///
/// # Endpoint
///
/// ```text
/// GET /api/modules/:id/reviews
/// ```
///
/// # Response
///
/// ```json
/// [
///   {
///     "id": 3,
///     "module_id": 7,
///     "user_id": 2,
///     "rating": 4.5,
///     "review_text": "Great dungeon",
///     "created_at": "2025-01-01T00:00:00Z",
///     "username": "bob",
///     "profile_picture": null
///   }
/// ]
/// ```
///
/// An unknown module yields an empty list.
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(module_id): Path<i64>,
) -> ApiResult<Json<Vec<ReviewWithAuthor>>> {
    let reviews = Review::list_by_module(&state.db, module_id).await?;
    Ok(Json(reviews))
}
