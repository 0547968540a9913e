//! Best-effort client IP extraction for rate-limit keying.

use axum::http::HeaderMap;

/// Reads the client IP from common proxy headers. With no proxy in front
/// (local dev, tests) there is nothing trustworthy to read, so fall back
/// to a stable placeholder instead of failing the request.
pub fn client_ip(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    forwarded.or(real_ip).unwrap_or("0.0.0.0").to_string()
}
