/// Session authentication for Axum
///
/// The API installs a layer that resolves the session cookie once per request
/// with [`resolve_session`] and, when it identifies a live session, inserts an
/// [`AuthContext`] into the request extensions.
///
/// Handlers then pick the variant they need:
///
/// - `AuthContext` for endpoints that require a login (401 when anonymous)
/// - `Option<AuthContext>` for endpoints that only probe the session
///
/// # Example
///
/// ```no_run
/// use modshare_shared::auth::middleware::AuthContext;
///
/// async fn protected_handler(auth: AuthContext) -> String {
///     format!("Hello, {}!", auth.username)
/// }
/// ```

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;

use super::session::{get_cookie, verify_cookie_value};
use crate::models::session::Session;

/// Identity of the authenticated caller
///
/// Carries only the user ID and username; the password hash never leaves the
/// store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: i64,

    /// Username recorded in the session
    pub username: String,

    /// Session backing this request
    #[serde(skip)]
    pub session_id: String,
}

impl AuthContext {
    /// Creates auth context from a stored session
    pub fn from_session(session: &Session) -> Self {
        Self {
            user_id: session.user_id,
            username: session.username.clone(),
            session_id: session.id.clone(),
        }
    }
}

/// Error type for session authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No live session on the request
    #[error("Not logged in")]
    MissingSession,

    /// Session store lookup failed
    #[error("Session lookup failed: {0}")]
    DatabaseError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AuthError::MissingSession => (StatusCode::UNAUTHORIZED, "unauthorized", "Not logged in"),
            AuthError::DatabaseError(msg) => {
                tracing::error!("Session lookup failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred",
                )
            }
        };

        (status, Json(json!({ "error": error, "message": message }))).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::MissingSession)
    }
}

/// Resolves the session cookie on a request into an [`AuthContext`]
///
/// Returns `Ok(None)` for a missing cookie, a bad signature, an unknown
/// session, or an expired one. Only a failing store lookup is an error; a
/// cookie that fails signature verification never reaches the store.
pub async fn resolve_session(
    pool: &SqlitePool,
    headers: &HeaderMap,
    cookie_name: &str,
    secret: &str,
) -> Result<Option<AuthContext>, AuthError> {
    let Some(session_id) = session_id_from_headers(headers, cookie_name, secret) else {
        return Ok(None);
    };

    let session = Session::find_active(pool, &session_id)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

    Ok(session.as_ref().map(AuthContext::from_session))
}

/// Reads and verifies the session ID from the `Cookie` headers
pub fn session_id_from_headers(
    headers: &HeaderMap,
    cookie_name: &str,
    secret: &str,
) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|cookie_header| get_cookie(cookie_header, cookie_name))
        .and_then(|value| verify_cookie_value(value, secret))
}
