/// Profile endpoints
///
/// - `POST /api/profile` - Update bio and/or profile picture (multipart)
/// - `GET /api/profile/:username` - Public profile with the user's modules

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::form::MultipartForm,
};
use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use modshare_shared::{
    auth::middleware::AuthContext,
    models::{
        module::Module,
        user::{PublicUser, UpdateProfile, User},
    },
    storage::FileKind,
};
use serde::Serialize;

const PICTURE_FIELD: &str = "profile_picture";

/// Profile update response
#[derive(Debug, Serialize)]
pub struct ProfileUpdateResponse {
    pub message: String,
    pub user: PublicUser,
}

/// Public profile response
#[derive(Debug, Serialize)]
pub struct UserProfileResponse {
    pub user: PublicUser,
    pub modules: Vec<Module>,
}

/// Update the caller's profile
///
/// # Endpoint
///
/// ```text
/// POST /api/profile
/// Content-Type: multipart/form-data
///
/// bio=<text>               (optional; empty string clears the bio)
/// profile_picture=<file>   (optional; .png/.jpg/.jpeg, at most one)
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Not logged in
/// - `400 Bad Request`: Neither field supplied, more than one picture, a
///   disallowed file type, or a picture that is not an image
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    multipart: Multipart,
) -> ApiResult<Json<ProfileUpdateResponse>> {
    let form = MultipartForm::read(multipart).await?;
    form.ensure_max_files(PICTURE_FIELD, 1)?;
    form.ensure_allowed_types()?;

    let bio = form.text("bio").map(str::to_string);
    let picture = form.files(PICTURE_FIELD).first();
    if let Some(upload) = picture {
        if upload.kind()? != FileKind::Image {
            return Err(ApiError::BadRequest(
                "Profile picture must be a .png, .jpg or .jpeg file".to_string(),
            ));
        }
    }

    if bio.is_none() && picture.is_none() {
        return Err(ApiError::BadRequest("No updates provided".to_string()));
    }

    let stored = match picture {
        Some(upload) => Some(state.uploads.store(upload).await?),
        None => None,
    };

    let update = UpdateProfile {
        bio,
        profile_picture: stored.as_ref().map(|file| file.reference.clone()),
    };

    let updated = match User::update_profile(&state.db, auth.user_id, update).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            state.uploads.discard(stored.as_slice()).await;
            return Err(ApiError::Unauthorized("Not logged in".to_string()));
        }
        Err(e) => {
            state.uploads.discard(stored.as_slice()).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        user_id = auth.user_id,
        picture = stored.is_some(),
        "Profile updated"
    );

    Ok(Json(ProfileUpdateResponse {
        message: "Profile updated".to_string(),
        user: updated.into(),
    }))
}

/// Public profile of a user
///
/// # Endpoint
///
/// ```text
/// GET /api/profile/:username
/// ```
///
/// # Response
///
/// ```json
/// {
///   "user": { "id": 1, "username": "alice", "bio": null, "profile_picture": null },
///   "modules": [ ... ]
/// }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: User not found
pub async fn get_user_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<UserProfileResponse>> {
    let user = User::find_by_username(&state.db, &username)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let modules = Module::list_by_user(&state.db, user.id).await?;

    Ok(Json(UserProfileResponse {
        user: user.into(),
        modules,
    }))
}
