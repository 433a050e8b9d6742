use axum::http::{HeaderMap, header};

/// Pull the presented token out of the Authorization header.
///
/// Clients send either the bare token or `Bearer <token>`; both are
/// accepted. Only the scheme is stripped, the token itself is returned
/// verbatim. A bare `Bearer` with nothing after it yields an empty token.
/// A header that is absent or not valid UTF-8 counts as missing.
pub fn presented_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    if value == "Bearer" {
        return Some("");
    }
    Some(value.strip_prefix("Bearer ").unwrap_or(value))
}
