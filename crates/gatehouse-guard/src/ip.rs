//! Client identifier extraction.
//!
//! Pre-auth requests have no user id, so the rate limiter keys on the
//! client IP as reported by the proxy chain. Headers are consulted in a
//! fixed trust order; a request carrying none of them is bucketed under
//! a single shared identifier rather than escaping the limiter.

use http::HeaderMap;

/// Identifier used when no trusted client-IP header is present.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Trusted client-IP headers, in priority order.
const CLIENT_IP_HEADERS: [&str; 4] = [
    "x-real-ip",
    "x-forwarded-for",
    "cf-connecting-ip",
    "x-client-ip",
];

/// Extracts the rate-limiter identifier for a request.
///
/// Checks `X-Real-IP`, `X-Forwarded-For` (first hop - the original
/// client when behind proxies), `CF-Connecting-IP` and `X-Client-IP` in
/// that order, falling back to [`UNKNOWN_CLIENT`].
#[must_use]
pub fn client_identifier(headers: &HeaderMap) -> String {
    for name in CLIENT_IP_HEADERS {
        if let Some(value) = headers.get(name)
            && let Ok(value) = value.to_str()
            && let Some(first) = value.split(',').next()
        {
            let candidate = first.trim();
            if !candidate.is_empty() {
                return candidate.to_string();
            }
        }
    }
    UNKNOWN_CLIENT.to_string()
}
