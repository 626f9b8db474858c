/// Password hashing module using Argon2id
///
/// Every stored credential is an Argon2id hash in PHC string format with a
/// per-password random salt. Plaintext passwords are never persisted or
/// compared directly.
///
/// # Parameters
///
/// - **Algorithm**: Argon2id
/// - **Memory**: 64 MB (65536 KB)
/// - **Iterations**: 3 passes
/// - **Parallelism**: 4 lanes
/// - **Output**: 32-byte hash
///
/// # Example
///
/// ```
/// use modshare_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("pw1")?;
/// assert!(verify_password("pw1", &hash)?);
/// assert!(!verify_password("wrong", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params, ParamsBuilder, Version,
};
use std::sync::OnceLock;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

fn argon2_params() -> Result<Params, PasswordError> {
    ParamsBuilder::new()
        .m_cost(65536) // 64 MB
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))
}

/// Hashes a password using Argon2id with a fresh random salt
///
/// Returns the PHC string, e.g. `$argon2id$v=19$m=65536,t=3,p=4$<salt>$<hash>`.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, argon2_params()?);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored hash
///
/// Parameters are read from the PHC string. Comparison is constant-time.
///
/// Returns `Ok(false)` on a mismatch and an error only for a malformed hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Burns one verification against a fixed hash and always reports a mismatch
///
/// Login calls this when the username does not exist so that path costs the
/// same as a wrong password and the two cannot be told apart by timing.
pub fn verify_against_dummy(password: &str) -> Result<bool, PasswordError> {
    static DUMMY_HASH: OnceLock<Result<String, String>> = OnceLock::new();

    let dummy = DUMMY_HASH
        .get_or_init(|| hash_password("modshare-dummy-credential").map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| PasswordError::HashError(e.clone()))?;

    verify_password(password, dummy)?;
    Ok(false)
}
