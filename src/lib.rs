//! Admission gate library.
//!
//! Every request passes through an ordered admission pipeline (CORS origin
//! check, per-client rate limiting, password gates) before it is forwarded to
//! the upstream web application.

pub mod auth;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::schema::GateConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
