//! Request authentication helpers

use axum::{
    body::Body,
    http::{Request, header},
};
use subtle::ConstantTimeEq;

/// Extract the API key from a request
///
/// Looks at `x-api-key` first, then `Authorization: Bearer <key>`.
pub fn extract_api_key(request: &Request<Body>) -> Option<String> {
    if let Some(key) = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
    {
        return Some(key.to_string());
    }

    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Compare two keys in constant time
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
