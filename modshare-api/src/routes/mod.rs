/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, logout, session probe, password change
/// - `profile`: Profile updates and public profiles
/// - `modules`: Module upload, listing, detail and download
/// - `reviews`: Review submission and listing
/// - `form`: Buffered multipart form reading shared by the upload endpoints

pub mod auth;
pub mod form;
pub mod health;
pub mod modules;
pub mod profile;
pub mod reviews;
