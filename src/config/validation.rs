//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference existing limiters)
//! - Validate value ranges (limits > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GateConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::{GateConfig, GateSettings};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("upstream.url: {0}")]
    InvalidUpstream(String),

    #[error("cors: invalid origin '{0}' (expected scheme://host[:port])")]
    InvalidOrigin(String),

    #[error("rate_limit: duplicate limiter name '{0}'")]
    DuplicateLimiter(String),

    #[error("rate_limit.{0}: limit and window_ms must be positive")]
    InvalidLimiter(String),

    #[error("routes.{route}: unknown limiter '{limiter}'")]
    UnknownLimiter { route: String, limiter: String },

    #[error("routes.{0}: path_prefix must start with '/'")]
    InvalidRoutePrefix(String),

    #[error("auth.{0}: cookie_name must not be empty")]
    EmptyCookieName(&'static str),

    #[error("auth: preview and admin gates share cookie '{0}'")]
    SharedCookieName(String),

    #[error("auth.{0}: login_path must start with '/'")]
    InvalidLoginPath(&'static str),

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(
        "listener.bind_address",
        &config.listener.bind_address,
        &mut errors,
    );
    if config.observability.metrics_enabled {
        check_address(
            "observability.metrics_address",
            &config.observability.metrics_address,
            &mut errors,
        );
    }

    match Url::parse(&config.upstream.url) {
        Ok(url) if !matches!(url.scheme(), "http" | "https") => errors.push(
            ValidationError::InvalidUpstream(format!("unsupported scheme '{}'", url.scheme())),
        ),
        Ok(url) if url.host_str().is_none() => {
            errors.push(ValidationError::InvalidUpstream("missing host".to_string()))
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::InvalidUpstream(e.to_string())),
    }

    for origin in config
        .cors
        .allowed_origins
        .iter()
        .chain(config.cors.development_origins.iter())
    {
        if !is_bare_origin(origin) {
            errors.push(ValidationError::InvalidOrigin(origin.clone()));
        }
    }

    let mut limiter_names = HashSet::new();
    for limiter in &config.rate_limit.limiters {
        if !limiter_names.insert(limiter.name.as_str()) {
            errors.push(ValidationError::DuplicateLimiter(limiter.name.clone()));
        }
        if limiter.limit == 0 || limiter.window_ms == 0 {
            errors.push(ValidationError::InvalidLimiter(limiter.name.clone()));
        }
    }

    for route in &config.routes {
        if let Some(limiter) = &route.rate_limit {
            if !limiter_names.contains(limiter.as_str()) {
                errors.push(ValidationError::UnknownLimiter {
                    route: route.name.clone(),
                    limiter: limiter.clone(),
                });
            }
        }
        if let Some(prefix) = &route.path_prefix {
            if !prefix.starts_with('/') {
                errors.push(ValidationError::InvalidRoutePrefix(route.name.clone()));
            }
        }
    }

    check_gate("preview", &config.auth.preview, &mut errors);
    check_gate("admin", &config.auth.admin, &mut errors);
    if !config.auth.preview.cookie_name.is_empty()
        && config.auth.preview.cookie_name == config.auth.admin.cookie_name
    {
        errors.push(ValidationError::SharedCookieName(
            config.auth.preview.cookie_name.clone(),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::NotPositive("timeouts.request_secs"));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::NotPositive("timeouts.connect_secs"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::NotPositive("security.max_body_size"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_gate(name: &'static str, gate: &GateSettings, errors: &mut Vec<ValidationError>) {
    if gate.cookie_name.trim().is_empty() {
        errors.push(ValidationError::EmptyCookieName(name));
    }
    if !gate.login_path.starts_with('/') {
        errors.push(ValidationError::InvalidLoginPath(name));
    }
}

/// True when `origin` serializes back to itself as a URL origin.
fn is_bare_origin(origin: &str) -> bool {
    if origin.contains('*') {
        return false;
    }
    match Url::parse(origin) {
        Ok(url) => url.origin().is_tuple() && url.origin().ascii_serialization() == origin,
        Err(_) => false,
    }
}
