/// Database connection pool management
///
/// This module provides the SQLite connection pool used by the API server.
/// Every connection is opened with foreign keys enforced, WAL journaling and a
/// busy timeout, so concurrent requests queue on the database lock instead of
/// failing immediately.
///
/// # Example
///
/// ```no_run
/// use modshare_shared::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: "sqlite://modshare.db".to_string(),
///         ..Default::default()
///     };
///
///     let pool = create_pool(config).await?;
///
///     let row: (i64,) = sqlx::query_as("SELECT ?")
///         .bind(42i64)
///         .fetch_one(&pool)
///         .await?;
///
///     Ok(())
/// }
/// ```

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the database connection pool
///
/// All timeouts are specified in seconds for ease of configuration from environment variables.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// SQLite connection URL (e.g., "sqlite://modshare.db")
    ///
    /// The database file is created when missing.
    pub url: String,

    /// Maximum number of connections in the pool
    ///
    /// Default: 10
    pub max_connections: u32,

    /// Minimum number of idle connections to maintain
    ///
    /// Default: 1
    pub min_connections: u32,

    /// Timeout for acquiring a connection from the pool (seconds)
    ///
    /// Default: 30 seconds
    pub connect_timeout_seconds: u64,

    /// How long a connection can remain idle before being closed (seconds)
    ///
    /// Default: Some(600) (10 minutes)
    pub idle_timeout_seconds: Option<u64>,

    /// How long a writer waits on a locked database before giving up (seconds)
    ///
    /// Default: 10 seconds
    pub busy_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_seconds: 30,
            idle_timeout_seconds: Some(600),
            busy_timeout_seconds: 10,
        }
    }
}

/// Creates and initializes a SQLite connection pool
///
/// This function:
/// 1. Parses the URL and applies per-connection pragmas
/// 2. Creates a pool with the specified configuration
/// 3. Performs a health check to verify the database answers
///
/// # Errors
///
/// Returns an error if:
/// - The database URL is invalid
/// - The database file cannot be opened or created
/// - Health check fails
pub async fn create_pool(config: DatabaseConfig) -> Result<SqlitePool, sqlx::Error> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        connect_timeout_seconds = config.connect_timeout_seconds,
        "Creating database connection pool"
    );

    let connect_options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(config.busy_timeout_seconds));

    let mut pool_options = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds));

    if let Some(idle_timeout) = config.idle_timeout_seconds {
        pool_options = pool_options.idle_timeout(Duration::from_secs(idle_timeout));
        debug!(idle_timeout_seconds = idle_timeout, "Set idle timeout");
    }

    let pool = pool_options.connect_with(connect_options).await?;

    health_check(&pool).await?;

    info!("Database connection pool created successfully");
    Ok(pool)
}

/// Performs a health check on the database connection
///
/// Executes a trivial query to verify the database is reachable and responding.
pub async fn health_check(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    debug!("Performing database health check");

    let result: (i32,) = sqlx::query_as("SELECT 1").fetch_one(pool).await?;

    if result.0 == 1 {
        debug!("Database health check passed");
        Ok(())
    } else {
        warn!("Database health check returned unexpected value: {}", result.0);
        Err(sqlx::Error::Protocol(
            "Health check returned unexpected value".into(),
        ))
    }
}

/// Current pool statistics for monitoring
#[derive(Debug, Clone)]
pub struct PoolStats {
    /// Number of connections currently in use
    pub active_connections: usize,

    /// Number of idle connections available
    pub idle_connections: usize,

    /// Total connections in the pool
    pub total_connections: usize,
}

/// Gets current pool statistics
pub fn get_pool_stats(pool: &SqlitePool) -> PoolStats {
    let size = pool.size();
    let idle = pool.num_idle();

    PoolStats {
        active_connections: (size as usize).saturating_sub(idle),
        idle_connections: idle,
        total_connections: size as usize,
    }
}

/// Gracefully closes the connection pool
///
/// Called during shutdown so the WAL is checkpointed and file handles released.
pub async fn close_pool(pool: SqlitePool) {
    info!("Closing database connection pool");
    pool.close().await;
    info!("Database connection pool closed");
}
