/// Database models for modshare
///
/// This module contains all database models and their queries.
///
/// # Models
///
/// - `user`: Accounts, credentials and profiles
/// - `module`: Uploaded content packages
/// - `image`: Preview images attached to a module (0-4)
/// - `review`: One rating per user per module
/// - `session`: Server-side login sessions

pub mod image;
pub mod module;
pub mod review;
pub mod session;
pub mod user;
