//! Origin allow-list enforcement and CORS response headers.
//!
//! # Request Handling
//! ```text
//! OPTIONS          → 204, CORS headers if the origin is allowed
//! Origin allowed   → proceed, headers attached to the response
//! Origin rejected  → 403, no CORS headers
//! No Origin        → proceed untouched (same-origin or non-browser)
//! ```
//!
//! The allowed origin is always echoed back exactly; `*` is never sent
//! because the gate's cookies may ride along.

use std::collections::HashSet;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Response, StatusCode};

use crate::config::{CorsConfig, Environment};

pub const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const ALLOWED_HEADERS: &str = "Content-Type, Authorization";
pub const MAX_AGE_SECS: &str = "86400";

/// Closed set of origins, fixed at startup.
#[derive(Debug, Clone, Default)]
pub struct AllowedOrigins {
    origins: HashSet<String>,
}

impl AllowedOrigins {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            origins: origins.into_iter().map(Into::into).collect(),
        }
    }

    /// Production origins, plus development origins outside production.
    pub fn from_config(config: &CorsConfig, environment: Environment) -> Self {
        let dev = if environment.is_production() {
            &[][..]
        } else {
            &config.development_origins[..]
        };
        Self::new(config.allowed_origins.iter().chain(dev).cloned())
    }

    /// Exact string membership, no pattern matching.
    pub fn contains(&self, origin: &str) -> bool {
        self.origins.contains(origin)
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }
}

/// Outcome of checking a request's `Origin` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginCheck {
    /// No `Origin` header: treated as trusted.
    Absent,
    /// Allowed; carries the exact value to echo.
    Allowed(HeaderValue),
    /// Present but not in the allow-list.
    Forbidden(String),
}

#[derive(Debug, Clone)]
pub struct CorsGate {
    origins: AllowedOrigins,
}

impl CorsGate {
    pub fn new(origins: AllowedOrigins) -> Self {
        Self { origins }
    }

    pub fn origins(&self) -> &AllowedOrigins {
        &self.origins
    }

    pub fn check(&self, headers: &HeaderMap) -> OriginCheck {
        let Some(value) = headers.get(header::ORIGIN) else {
            return OriginCheck::Absent;
        };

        match value.to_str() {
            Ok(origin) if self.origins.contains(origin) => OriginCheck::Allowed(value.clone()),
            Ok(origin) => OriginCheck::Forbidden(origin.to_string()),
            Err(_) => OriginCheck::Forbidden(String::from_utf8_lossy(value.as_bytes()).into_owned()),
        }
    }

    /// Answer an `OPTIONS` request without reaching the upstream.
    pub fn preflight(&self, headers: &HeaderMap) -> Response<Body> {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        if let OriginCheck::Allowed(origin) = self.check(headers) {
            apply_headers(response.headers_mut(), origin);
        }
        response
    }
}

/// Attach the CORS header set for an allowed origin.
pub fn apply_headers(headers: &mut HeaderMap, origin: HeaderValue) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(MAX_AGE_SECS),
    );
    headers.append(header::VARY, HeaderValue::from_static("Origin"));
}
