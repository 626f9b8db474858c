//! # modshare Shared Library
//!
//! Data model, store access and the building blocks of the modshare API:
//!
//! ## Module Organization
//!
//! - `models`: Database models and their queries
//! - `auth`: Password hashing, session tokens, request session resolution
//! - `db`: Connection pool, migrations and constraint helpers
//! - `storage`: File intake and the managed upload directory

pub mod auth;
pub mod db;
pub mod models;
pub mod storage;

/// Current version of the modshare shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
