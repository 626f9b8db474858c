/// Authentication endpoints
///
/// This module provides account and session endpoints:
/// - Registration
/// - Login / logout
/// - Session probe
/// - Password change
///
/// # Endpoints
///
/// - `POST /api/register` - Create an account
/// - `POST /api/login` - Start a session (sets the session cookie)
/// - `POST /api/logout` - End the session (clears the cookie)
/// - `GET /api/session` - Who am I
/// - `POST /api/profile/password` - Change password

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use modshare_shared::{
    auth::{
        middleware::AuthContext,
        password::{self, PasswordError},
        session::{build_clear_cookie, build_session_cookie, generate_session_id, sign_session_id},
    },
    db,
    models::{
        session::Session,
        user::{CreateUser, User},
    },
};
use serde::{Deserialize, Serialize};
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Username, trimmed before validation
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "Username must be 1 to 50 characters"))]
    pub username: String,

    /// Password
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,
}

/// Password change request
///
/// Accepts both `current_password` and `currentPassword` spellings.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default, alias = "currentPassword")]
    pub current_password: String,

    #[serde(default, alias = "newPassword")]
    pub new_password: String,
}

/// Identity returned to clients: ID and username only
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
}

impl From<&AuthContext> for SessionUser {
    fn from(auth: &AuthContext) -> Self {
        Self {
            id: auth.user_id,
            username: auth.username.clone(),
        }
    }
}

/// Register / login response
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: SessionUser,
}

/// Session probe response
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// `null` when anonymous
    pub user: Option<SessionUser>,
}

/// Plain acknowledgement
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Runs Argon2 work off the async worker threads
async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> Result<T, PasswordError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::InternalError(format!("Password task failed: {}", e)))?
        .map_err(ApiError::from)
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/register
/// Content-Type: application/json
///
/// { "username": "alice", "password": "pw1" }
/// ```
///
/// # Response
///
/// ```json
/// { "message": "User registered", "user": { "id": 1, "username": "alice" } }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing username or password, username too long
/// - `409 Conflict`: Username already exists
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let req = RegisterRequest {
        username: req.username.trim().to_string(),
        password: req.password,
    };
    req.validate()?;

    let password = req.password;
    let password_hash = blocking(move || password::hash_password(&password)).await?;

    // No pre-check: the UNIQUE constraint decides
    let user = User::create(
        &state.db,
        CreateUser {
            username: req.username,
            password_hash,
        },
    )
    .await
    .map_err(|e| {
        if db::is_unique_violation(&e) {
            ApiError::Conflict("Username already exists".to_string())
        } else {
            e.into()
        }
    })?;

    tracing::info!(user_id = user.id, username = %user.username, "User registered");

    Ok(Json(AuthResponse {
        message: "User registered".to_string(),
        user: SessionUser {
            id: user.id,
            username: user.username,
        },
    }))
}

/// Login endpoint
///
/// Unknown usernames and wrong passwords get the same 401 body, and both
/// paths run one Argon2 verification.
///
/// # Endpoint
///
/// ```text
/// POST /api/login
/// Content-Type: application/json
///
/// { "username": "alice", "password": "pw1" }
/// ```
///
/// # Response
///
/// `Set-Cookie: modshare_session=<id>.<signature>; HttpOnly; ...`
///
/// ```json
/// { "message": "Logged in", "user": { "id": 1, "username": "alice" } }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    // Usernames are stored trimmed
    let user = User::find_by_username(&state.db, req.username.trim()).await?;

    let candidate = req.password;
    let verified = match &user {
        Some(user) => {
            let hash = user.password_hash.clone();
            blocking(move || password::verify_password(&candidate, &hash)).await?
        }
        None => {
            blocking(move || password::verify_against_dummy(&candidate)).await?;
            false
        }
    };

    let user = match user {
        Some(user) if verified => user,
        _ => {
            tracing::debug!("Login rejected");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
    };

    let purged = Session::delete_expired(&state.db).await?;
    if purged > 0 {
        tracing::debug!(purged, "Purged expired sessions");
    }

    let session_id = generate_session_id();
    let session = Session::create(
        &state.db,
        &session_id,
        user.id,
        &user.username,
        state.config.session.ttl(),
    )
    .await?;

    let cookie = build_session_cookie(
        &state.config.session.cookie_settings(),
        &sign_session_id(&session.id, &state.config.session.secret),
    );

    tracing::info!(user_id = user.id, "User logged in");

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            message: "Logged in".to_string(),
            user: SessionUser {
                id: user.id,
                username: user.username,
            },
        }),
    ))
}

/// Logout endpoint
///
/// Deletes the server-side session when there is one and always clears the
/// cookie. Never fails for an anonymous caller.
///
/// # Response
///
/// ```json
/// { "message": "Logged out" }
/// ```
pub async fn logout(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
) -> ApiResult<impl IntoResponse> {
    if let Some(auth) = auth {
        Session::delete(&state.db, &auth.session_id).await?;
        tracing::info!(user_id = auth.user_id, "User logged out");
    }

    let cookie = build_clear_cookie(&state.config.session.cookie_settings());

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(MessageResponse::new("Logged out")),
    ))
}

/// Session probe
///
/// # Response
///
/// ```json
/// { "user": { "id": 1, "username": "alice" } }
/// ```
///
/// or `{ "user": null }` when the cookie is missing, forged or expired.
pub async fn session(auth: Option<AuthContext>) -> Json<SessionResponse> {
    Json(SessionResponse {
        user: auth.as_ref().map(SessionUser::from),
    })
}

/// Change password
///
/// # Endpoint
///
/// ```text
/// POST /api/profile/password
/// Content-Type: application/json
///
/// { "current_password": "pw1", "new_password": "pw2" }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Not logged in, or invalid current password
/// - `400 Bad Request`: Either field missing
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    if req.current_password.is_empty() || req.new_password.is_empty() {
        return Err(ApiError::BadRequest(
            "Current and new passwords required".to_string(),
        ));
    }

    let invalid_current = || ApiError::Unauthorized("Invalid current password".to_string());

    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(invalid_current)?;

    let current = req.current_password;
    let hash = user.password_hash;
    if !blocking(move || password::verify_password(&current, &hash)).await? {
        return Err(invalid_current());
    }

    let new_password = req.new_password;
    let new_hash = blocking(move || password::hash_password(&new_password)).await?;

    if !User::update_password(&state.db, auth.user_id, &new_hash).await? {
        return Err(invalid_current());
    }

    tracing::info!(user_id = auth.user_id, "Password changed");

    Ok(Json(MessageResponse::new("Password changed")))
}
