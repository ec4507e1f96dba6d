//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! gate.toml (optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides, secrets)
//!     → validation.rs (semantic checks)
//!     → GateConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Secrets come only from the environment, never from the file
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{finalize, load_config, ConfigError};
pub use schema::{
    AuthConfig, BypassConfig, Challenge, CorsConfig, Environment, GateConfig, GateKind,
    GateSettings, LimiterConfig, ListenerConfig, LogFormat, ObservabilityConfig, RateLimitConfig,
    RouteConfig, Secret, SecurityConfig, TimeoutConfig, UpstreamConfig,
};
