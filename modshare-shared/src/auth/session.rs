/// Session tokens and cookie plumbing
///
/// The client holds `<session id>.<signature>` in an HttpOnly cookie, where
/// the signature is the hex HMAC-SHA256 of the ID under the deployment's
/// session secret. The ID alone is a lookup key into the `sessions` table; the
/// signature lets the server reject forged or corrupted cookies without
/// touching the store.
///
/// # Example
///
/// ```
/// use modshare_shared::auth::session::{generate_session_id, sign_session_id, verify_cookie_value};
///
/// let secret = "a-session-secret-that-is-at-least-32-bytes";
/// let id = generate_session_id();
/// let cookie_value = sign_session_id(&id, secret);
///
/// assert_eq!(verify_cookie_value(&cookie_value, secret).as_deref(), Some(id.as_str()));
/// assert!(verify_cookie_value(&cookie_value, "another-secret-of-sufficient-length!!").is_none());
/// ```

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length of a session ID (characters)
pub const SESSION_ID_LENGTH: usize = 43;

/// Generates a new random session ID
///
/// Base62 over `rand::thread_rng()`, roughly 256 bits of entropy.
pub fn generate_session_id() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    (0..SESSION_ID_LENGTH)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

fn mac_for(secret: &str) -> HmacSha256 {
    // HMAC accepts keys of any length
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size")
}

/// Produces the cookie value `<id>.<hex signature>`
pub fn sign_session_id(id: &str, secret: &str) -> String {
    let mut mac = mac_for(secret);
    mac.update(id.as_bytes());
    format!("{}.{}", id, hex::encode(mac.finalize().into_bytes()))
}

/// Checks a cookie value's signature and returns the session ID it carries
///
/// The comparison is constant-time. Any malformed value yields `None`.
pub fn verify_cookie_value(value: &str, secret: &str) -> Option<String> {
    let (id, signature) = value.rsplit_once('.')?;
    if id.len() != SESSION_ID_LENGTH || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    let signature = hex::decode(signature).ok()?;
    let mut mac = mac_for(secret);
    mac.update(id.as_bytes());
    mac.verify_slice(&signature).ok()?;

    Some(id.to_string())
}

/// Extracts a named cookie from a `Cookie` header value
pub fn get_cookie<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header.split(';').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        (key.trim() == name).then(|| value.trim())
    })
}

/// Attributes of the session cookie
#[derive(Debug, Clone)]
pub struct CookieSettings {
    /// Cookie name
    pub name: String,

    /// Lifetime in seconds, matching the session TTL
    pub max_age_secs: i64,

    /// Adds the `Secure` attribute (HTTPS deployments)
    pub secure: bool,
}

/// Builds the `Set-Cookie` value that installs a session
pub fn build_session_cookie(settings: &CookieSettings, value: &str) -> String {
    let secure_attr = if settings.secure { "; Secure" } else { "" };
    format!(
        "{}={}; HttpOnly{}; Path=/; Max-Age={}; SameSite=Lax",
        settings.name,
        value,
        secure_attr,
        settings.max_age_secs.max(0)
    )
}

/// Builds the `Set-Cookie` value that removes the session cookie
pub fn build_clear_cookie(settings: &CookieSettings) -> String {
    let secure_attr = if settings.secure { "; Secure" } else { "" };
    format!(
        "{}=; HttpOnly{}; Path=/; Max-Age=0; SameSite=Lax",
        settings.name, secure_attr
    )
}
