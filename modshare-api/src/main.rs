//! # modshare API Server
//!
//! REST API for sharing user-authored modules: accounts and sessions,
//! module uploads with images, downloads, and reviews.
//!
//! ## Usage
//!
//! ```bash
//! MODSHARE_SESSION__SECRET=$(openssl rand -hex 32) cargo run -p modshare-api
//! ```

use anyhow::Context;
use modshare_api::{
    app::{build_router, AppState},
    config::Config,
};
use modshare_shared::db::{
    migrations::run_migrations,
    pool::{close_pool, create_pool, get_pool_stats, DatabaseConfig},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "modshare_api=debug,modshare_shared=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "modshare API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::load().context("Failed to load configuration")?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await
    .context("Failed to connect to database")?;

    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let stats = get_pool_stats(&pool);
    tracing::info!(
        connections = stats.total_connections,
        idle = stats.idle_connections,
        "Database ready"
    );

    let bind_address = config.bind_address();
    let state = AppState::new(pool.clone(), config);
    state.uploads.ensure_root().await.with_context(|| {
        format!(
            "Failed to create upload directory {}",
            state.uploads.root().display()
        )
    })?;

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shutdown signal received, closing database pool...");
    close_pool(pool).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
