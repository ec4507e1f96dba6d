//! Password gates and their endpoints.
//!
//! Two independent gates share one design: the preview gate walls off a
//! whole non-production deployment, the admin gate protects the admin tool.
//! They differ only in cookie name, secret, login page and SameSite policy.

pub mod gate;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};

use self::handlers::*;
use crate::http::server::AppState;

pub use gate::{AuthGate, AuthGates, SESSION_MARKER, SESSION_MAX_AGE_SECS};

/// Login, logout and status endpoints of the preview gate live under this.
pub const PREVIEW_AUTH_PREFIX: &str = "/api/auth";
pub const ADMIN_AUTH_PREFIX: &str = "/api/admin/auth";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(&format!("{PREVIEW_AUTH_PREFIX}/login"), post(preview_login))
        .route(&format!("{PREVIEW_AUTH_PREFIX}/logout"), post(preview_logout))
        .route(&format!("{PREVIEW_AUTH_PREFIX}/status"), get(preview_status))
        .route(&format!("{ADMIN_AUTH_PREFIX}/login"), post(admin_login))
        .route(&format!("{ADMIN_AUTH_PREFIX}/logout"), post(admin_logout))
        .route(&format!("{ADMIN_AUTH_PREFIX}/status"), get(admin_status))
}
