//! Optional bearer-token guard for the RPC and blob routes

use axum::http::{HeaderMap, header};
use tracing::warn;

/// Whether a request may pass.
///
/// An empty `configured_token` disables the guard.
pub fn authorize(configured_token: &str, headers: &HeaderMap) -> bool {
    if configured_token.is_empty() {
        return true;
    }
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer_token);
    match provided {
        Some(token) => constant_time_eq(configured_token.as_bytes(), token.as_bytes()),
        None => {
            warn!("Gateway auth: no bearer token provided");
            false
        }
    }
}

/// Token from an `Authorization: Bearer <token>` value; the scheme is case-insensitive
pub fn extract_bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Compare without short-circuiting on the first differing byte
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |diff, (x, y)| diff | (x ^ y)) == 0
}
