/// Authentication utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`session`]: Session IDs, cookie signing and cookie headers
/// - [`middleware`]: Request-level session resolution and the `AuthContext` extractor
///
/// # Example
///
/// ```
/// use modshare_shared::auth::password::{hash_password, verify_password};
/// use modshare_shared::auth::session::{generate_session_id, sign_session_id};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let cookie_value = sign_session_id(&generate_session_id(), "secret-of-at-least-32-characters!");
/// assert!(cookie_value.contains('.'));
/// # Ok(())
/// # }
/// ```

pub mod middleware;
pub mod password;
pub mod session;
