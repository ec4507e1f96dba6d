//! Admission Middleware.
//! Runs every inbound request through the gate's checks before it reaches a
//! handler or the upstream.
//!
//! ```text
//! OPTIONS             → CORS preflight (204), stop
//! non-canonical path  → 400
//! bypassed path       → forward untouched
//! otherwise           → identity → CORS → rate limit → auth gate → forward
//! ```

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::Challenge;
use crate::http::request::request_id_of;
use crate::http::response::Rejection;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::routing::path;
use crate::security::client_ip;
use crate::security::cors::{self, OriginCheck};
use crate::security::rate_limit::{insert_rate_limit_headers, RateLimitDecision};

/// Context attached to admitted requests.
#[derive(Clone, Debug)]
pub struct ClientContext {
    pub client: String,
    pub route: String,
}

pub async fn admission_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    // 1. Preflight never reaches route logic.
    if req.method() == Method::OPTIONS {
        return state.cors.preflight(req.headers());
    }

    // 2. Policies and the upstream must see the same path.
    if !path::is_canonical(req.uri().path()) {
        tracing::warn!(
            request_id = %request_id_of(req.headers()),
            path = %req.uri().path(),
            "Non-canonical path rejected"
        );
        return reject(Rejection::MalformedPath, None);
    }

    // 3. Bypass rules.
    let policy = state.policies.resolve(req.uri().path());
    if policy.bypass {
        return next.run(req).await;
    }

    // 4. Identity.
    let client = client_ip::resolve(req.headers());
    let request_id = request_id_of(req.headers()).to_string();
    let path = req.uri().path().to_string();

    // 5. CORS.
    let allowed_origin: Option<HeaderValue> = if policy.cors {
        match state.cors.check(req.headers()) {
            OriginCheck::Absent => None,
            OriginCheck::Allowed(origin) => Some(origin),
            OriginCheck::Forbidden(origin) => {
                tracing::warn!(
                    request_id = %request_id,
                    client = %client,
                    path = %path,
                    origin = %origin,
                    "Origin not allowed"
                );
                return reject(Rejection::OriginForbidden, None);
            }
        }
    } else {
        None
    };

    // 6. Rate limit.
    let mut decision: Option<RateLimitDecision> = None;
    if let Some(limiter) = &policy.limiter {
        let checked = limiter.check(&client);
        if checked.limited {
            let retry_after_secs = checked.retry_after_secs(std::time::Instant::now());
            tracing::warn!(
                request_id = %request_id,
                client = %client,
                path = %path,
                limiter = %limiter.name(),
                retry_after_secs,
                "Rate limit exceeded"
            );
            return reject(
                Rejection::RateLimited {
                    limit: checked.limit,
                    retry_after_secs,
                },
                allowed_origin,
            );
        }
        decision = Some(checked);
    }

    // 7. Auth gate.
    if let Some(kind) = policy.gate {
        let gate = state.gates.get(kind);
        if !gate.admits(req.headers()) {
            tracing::warn!(
                request_id = %request_id,
                client = %client,
                path = %path,
                gate = %kind,
                "Session required"
            );
            let rejection = match policy.challenge {
                Challenge::Redirect => {
                    let original = req
                        .uri()
                        .path_and_query()
                        .map(|pq| pq.as_str())
                        .unwrap_or("/");
                    Rejection::LoginRequired {
                        location: gate.login_redirect(original),
                    }
                }
                Challenge::Unauthorized => Rejection::Unauthenticated,
            };
            return reject(rejection, allowed_origin);
        }
    }

    // 8. Forward.
    tracing::debug!(
        request_id = %request_id,
        client = %client,
        route = %policy.name,
        "Request admitted"
    );
    req.extensions_mut().insert(ClientContext {
        client,
        route: policy.name.clone(),
    });

    let mut response = next.run(req).await;
    if let Some(origin) = allowed_origin {
        cors::apply_headers(response.headers_mut(), origin);
    }
    if let Some(decision) = decision {
        insert_rate_limit_headers(response.headers_mut(), &decision);
    }
    response
}

fn reject(rejection: Rejection, allowed_origin: Option<HeaderValue>) -> Response {
    metrics::record_rejection(rejection.reason());
    let mut response = rejection.into_response();
    // Browsers can only read a 401/429 cross-origin if the CORS headers are there.
    if let Some(origin) = allowed_origin {
        cors::apply_headers(response.headers_mut(), origin);
    }
    response
}
