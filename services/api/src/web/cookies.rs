//! services/api/src/web/cookies.rs
//!
//! Builds and reads the two cookies the API uses: the session token and the
//! pending post-login redirect.

use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

pub const SESSION_COOKIE: &str = "session";
pub const REDIRECT_COOKIE: &str = "redirect_to";

/// Finds a cookie value across all `Cookie` headers of a request.
pub fn read(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| {
            let (key, value) = c.trim().split_once('=')?;
            (key == name && !value.is_empty()).then(|| value.to_string())
        })
}

pub fn session_cookie(token: &str, max_age_secs: i64, production: bool) -> String {
    build(SESSION_COOKIE, token, max_age_secs, production)
}

/// Remembers where an anonymous request was headed, for one later login.
pub fn redirect_cookie(target: &str, production: bool) -> String {
    let encoded = URL_SAFE_NO_PAD.encode(target.as_bytes());
    build(REDIRECT_COOKIE, &encoded, 10 * 60, production)
}

/// Decodes a redirect cookie value. Only same-site absolute paths are returned.
pub fn decode_redirect(value: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(value).ok()?;
    let target = String::from_utf8(bytes).ok()?;
    (target.starts_with('/') && !target.starts_with("//")).then_some(target)
}

pub fn clear(name: &str, production: bool) -> String {
    build(name, "", 0, production)
}

fn build(name: &str, value: &str, max_age_secs: i64, production: bool) -> String {
    let same_site = if production {
        "Secure; SameSite=None"
    } else {
        "SameSite=Lax"
    };
    format!(
        "{}={}; HttpOnly; {}; Path=/; Max-Age={}",
        name, value, same_site, max_age_secs
    )
}
