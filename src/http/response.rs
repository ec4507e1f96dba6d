//! Terminal responses produced by the gate.
//!
//! Bodies are deliberately generic; the reason for a rejection is logged
//! server-side only.

use axum::{
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
};

use crate::security::rate_limit::{X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING};

/// Why the admission pipeline stopped a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Path is not in canonical form (dot segments, escaped unreserved
    /// characters, repeated or escaped slashes).
    MalformedPath,
    /// Origin header present but not allowed.
    OriginForbidden,
    /// Rate limit exceeded.
    RateLimited { limit: u32, retry_after_secs: u64 },
    /// API route without a valid session.
    Unauthenticated,
    /// Browser route without a valid session; redirect to the login page.
    LoginRequired { location: String },
}

impl Rejection {
    /// Metric/log label.
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::MalformedPath => "path",
            Rejection::OriginForbidden => "cors",
            Rejection::RateLimited { .. } => "rate_limit",
            Rejection::Unauthenticated | Rejection::LoginRequired { .. } => "unauthenticated",
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        match self {
            Rejection::MalformedPath => (StatusCode::BAD_REQUEST, "Bad request").into_response(),
            Rejection::OriginForbidden => (StatusCode::FORBIDDEN, "Forbidden").into_response(),
            Rejection::RateLimited {
                limit,
                retry_after_secs,
            } => {
                let mut response =
                    (StatusCode::TOO_MANY_REQUESTS, "Too many requests").into_response();
                let headers = response.headers_mut();
                headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
                headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from_static("0"));
                response
            }
            Rejection::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
            }
            Rejection::LoginRequired { location } => {
                Redirect::temporary(&location).into_response()
            }
        }
    }
}

/// Upstream could not be reached or failed mid-response.
pub fn upstream_failure() -> Response {
    (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
}

/// Connection-level headers that must not be forwarded.
static HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
];

/// Strip hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
    headers.remove(header::TRANSFER_ENCODING);
}
