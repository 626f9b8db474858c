/// Configuration management for the API server
///
/// Configuration is layered, lowest precedence first:
///
/// 1. Built-in defaults
/// 2. Optional `modshare.toml` in the working directory (or the file named by
///    `MODSHARE_CONFIG`)
/// 3. `MODSHARE_*` environment variables, with `__` between section and key
///
/// A `.env` file is loaded first when present.
///
/// # Environment Variables
///
/// - `MODSHARE_API__HOST` / `MODSHARE_API__PORT`: Bind address (default 0.0.0.0:5000)
/// - `MODSHARE_API__CORS_ORIGINS`: Comma-separated origins, `*` mirrors any origin
/// - `MODSHARE_API__PRODUCTION`: Enables HSTS
/// - `MODSHARE_DATABASE__URL`: SQLite URL (default `sqlite://modshare.db`)
/// - `MODSHARE_SESSION__SECRET`: Cookie signing secret (required, 32+ chars)
/// - `MODSHARE_SESSION__TTL_HOURS`: Session lifetime (default 24)
/// - `MODSHARE_UPLOADS__DIR`: Managed upload directory (default `uploads`)
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use modshare_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::load()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use modshare_shared::auth::session::CookieSettings;
use serde::{Deserialize, Serialize};

/// Minimum accepted length of the session secret
pub const MIN_SESSION_SECRET_LEN: usize = 32;

/// Longest accepted session lifetime (one year)
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 366;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Session configuration
    pub session: SessionConfig,

    /// Upload storage configuration
    pub uploads: UploadsConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` mirrors the request origin
    pub cors_origins: Vec<String>,

    /// Production mode (HSTS)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Secret key for signing session cookies
    ///
    /// Must be kept secret and at least 32 characters.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Session lifetime in hours, counted from login
    pub ttl_hours: i64,

    /// Name of the session cookie
    pub cookie_name: String,

    /// Mark the cookie `Secure` (HTTPS only)
    pub secure_cookie: bool,
}

/// Upload storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadsConfig {
    /// Managed upload directory
    pub dir: String,

    /// Maximum request body size for upload endpoints (bytes)
    pub max_body_bytes: usize,
}

impl SessionConfig {
    /// Session lifetime
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.ttl_hours)
    }

    /// Cookie attributes derived from this configuration
    pub fn cookie_settings(&self) -> CookieSettings {
        CookieSettings {
            name: self.cookie_name.clone(),
            max_age_secs: self.ttl().num_seconds(),
            secure: self.secure_cookie,
        }
    }
}

impl Config {
    /// Loads configuration from defaults, optional file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A source cannot be parsed
    /// - The session secret is missing or shorter than 32 characters
    /// - A value is out of range
    pub fn load() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let mut builder = ::config::Config::builder()
            .set_default("api.host", "0.0.0.0")?
            .set_default("api.port", 5000)?
            .set_default("api.cors_origins", vec!["*"])?
            .set_default("api.production", false)?
            .set_default("database.url", "sqlite://modshare.db")?
            .set_default("database.max_connections", 10)?
            .set_default("session.secret", "")?
            .set_default("session.ttl_hours", 24)?
            .set_default("session.cookie_name", "modshare_session")?
            .set_default("session.secure_cookie", false)?
            .set_default("uploads.dir", "uploads")?
            .set_default("uploads.max_body_bytes", 50 * 1024 * 1024)?
            .add_source(::config::File::with_name("modshare").required(false));

        if let Ok(path) = std::env::var("MODSHARE_CONFIG") {
            builder = builder.add_source(::config::File::with_name(&path).required(true));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("MODSHARE")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("api.cors_origins")
                .try_parsing(true),
        );

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values the type system cannot
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.session.secret.trim().is_empty() {
            anyhow::bail!("MODSHARE_SESSION__SECRET is required");
        }
        if self.session.secret.len() < MIN_SESSION_SECRET_LEN {
            anyhow::bail!(
                "session secret must be at least {} characters long",
                MIN_SESSION_SECRET_LEN
            );
        }
        if self.session.ttl_hours <= 0 {
            anyhow::bail!("session.ttl_hours must be positive");
        }
        if self.session.ttl_hours > MAX_SESSION_TTL_HOURS {
            anyhow::bail!(
                "session.ttl_hours must be at most {}",
                MAX_SESSION_TTL_HOURS
            );
        }
        if self.api.port == 0 {
            anyhow::bail!("invalid api.port: 0");
        }
        if self.uploads.dir.trim().is_empty() {
            anyhow::bail!("uploads.dir must not be empty");
        }
        Ok(())
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: "sqlite://test.db".to_string(),
                max_connections: 5,
            },
            session: SessionConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
                ttl_hours: 24,
                cookie_name: "modshare_session".to_string(),
                secure_cookie: false,
            },
            uploads: UploadsConfig {
                dir: "uploads".to_string(),
                max_body_bytes: 1024,
            },
        }
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(test_config().bind_address(), "127.0.0.1:5000");
    }

    #[test]
    fn test_validate_accepts_good_config() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let mut config = test_config();
        config.session.secret = "too-short".to_string();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("at least 32"));

        config.session.secret = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = test_config();
        config.session.ttl_hours = 0;
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.api.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_caps_session_ttl() {
        let mut config = test_config();
        config.session.ttl_hours = MAX_SESSION_TTL_HOURS;
        assert!(config.validate().is_ok());
        assert_eq!(config.session.ttl(), chrono::Duration::days(366));

        config.session.ttl_hours = MAX_SESSION_TTL_HOURS + 1;
        assert!(config.validate().is_err());

        config.session.ttl_hours = i64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cookie_settings_follow_ttl() {
        let settings = test_config().session.cookie_settings();
        assert_eq!(settings.name, "modshare_session");
        assert_eq!(settings.max_age_secs, 24 * 3600);
        assert!(!settings.secure);
    }
}
