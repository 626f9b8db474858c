/// Session resolution middleware
///
/// Runs on every `/api` request. When the request carries a validly signed
/// session cookie that maps to a live session, an [`AuthContext`] is inserted
/// into the request extensions. Anonymous requests pass through untouched;
/// whether a login is required is decided by each handler's extractor
/// (`AuthContext` vs `Option<AuthContext>`).

use crate::{app::AppState, error::ApiError};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use modshare_shared::auth::middleware::{resolve_session, AuthContext};

/// Resolves the session cookie and injects the caller's identity
pub async fn session_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth: Option<AuthContext> = resolve_session(
        &state.db,
        req.headers(),
        &state.config.session.cookie_name,
        &state.config.session.secret,
    )
    .await?;

    if let Some(auth) = auth {
        tracing::trace!(user_id = auth.user_id, "Session resolved");
        req.extensions_mut().insert(auth);
    }

    Ok(next.run(req).await)
}
