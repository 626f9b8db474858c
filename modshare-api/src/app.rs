/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use modshare_api::{app::AppState, config::Config};
/// use modshare_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::load()?;
/// let pool = create_pool(DatabaseConfig {
///     url: config.database.url.clone(),
///     ..Default::default()
/// })
/// .await?;
/// let state = AppState::new(pool, config);
/// let app = modshare_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{security::SecurityHeadersLayer, session::session_layer},
};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use modshare_shared::storage::UploadStore;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Managed upload directory
    pub uploads: UploadStore,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: SqlitePool, config: Config) -> Self {
        let uploads = UploadStore::new(&config.uploads.dir);
        Self {
            db,
            config: Arc::new(config),
            uploads,
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Health check (public)
/// ├── /uploads/*                       # Stored files (static)
/// └── /api/
///     ├── POST /register
///     ├── POST /login
///     ├── POST /logout
///     ├── GET  /session
///     ├── POST /profile                # multipart, login required
///     ├── POST /profile/password       # login required
///     ├── GET  /profile/:username
///     ├── GET  /modules
///     ├── POST /modules                # multipart, login required
///     ├── GET  /modules/:id
///     ├── GET  /modules/:id/download
///     ├── GET  /modules/:id/reviews
///     └── POST /reviews                # login required
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Session resolution (`/api` only)
/// 5. Body limit (`/api` only)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let max_body = state.config.uploads.max_body_bytes;

    let api_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout))
        .route("/session", get(routes::auth::session))
        .route("/profile", post(routes::profile::update_profile))
        .route("/profile/password", post(routes::auth::change_password))
        .route("/profile/:username", get(routes::profile::get_user_profile))
        .route(
            "/modules",
            get(routes::modules::list_modules).post(routes::modules::create_module),
        )
        .route("/modules/:id", get(routes::modules::get_module))
        .route("/modules/:id/download", get(routes::modules::download_module))
        .route("/modules/:id/reviews", get(routes::reviews::list_reviews))
        .route("/reviews", post(routes::reviews::submit_review))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_layer,
        ))
        .layer(DefaultBodyLimit::max(max_body));

    let cors = build_cors(&state.config);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .nest_service("/uploads", ServeDir::new(state.uploads.root()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// CORS policy from configuration
///
/// `*` mirrors the request origin and allows credentials, so the session
/// cookie works from any front-end during development. Otherwise only the
/// listed origins are allowed.
fn build_cors(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::very_permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
