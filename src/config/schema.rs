//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the admission gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Deployment environment (controls secure cookies and dev origins).
    pub environment: Environment,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The web application that admitted requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Cross-origin allow-list.
    pub cors: CorsConfig,

    /// Preview and admin password gates.
    pub auth: AuthConfig,

    /// Named rate limiters.
    pub rate_limit: RateLimitConfig,

    /// Route policies, matched by path prefix.
    pub routes: Vec<RouteConfig>,

    /// Paths that skip the admission pipeline entirely.
    pub bypass: BypassConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Security hardening.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl GateConfig {
    /// Default config with the standard route table and bypass rules.
    ///
    /// `Default` yields empty route and limiter tables so partial TOML files
    /// stay partial; this is what the binary uses when no file is given.
    pub fn standard() -> Self {
        Self {
            rate_limit: RateLimitConfig::standard(),
            routes: RouteConfig::standard(),
            bypass: BypassConfig::standard(),
            ..Self::default()
        }
    }
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "development" | "dev" => Ok(Environment::Development),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream web application.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the application (scheme and authority are used).
    pub url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3000".to_string(),
        }
    }
}

/// CORS allow-list. Matching is exact string membership.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed in every environment.
    pub allowed_origins: Vec<String>,

    /// Origins added only outside production.
    pub development_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "https://mindandmuscle.ai".to_string(),
                "https://www.mindandmuscle.ai".to_string(),
            ],
            development_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// Which password gate protects a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GateKind {
    Preview,
    Admin,
}

impl GateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateKind::Preview => "preview",
            GateKind::Admin => "admin",
        }
    }
}

impl std::fmt::Display for GateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an unauthenticated request is turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Challenge {
    /// Browser-facing: redirect to the gate's login page.
    #[default]
    Redirect,
    /// API: plain 401.
    Unauthorized,
}

/// Shared secret loaded from the environment. Never printed.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret([redacted])")
    }
}

/// Settings for one password gate.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GateSettings {
    /// When false, routes bound to this gate pass without a session.
    pub enabled: bool,

    /// Name of the marker cookie.
    pub cookie_name: String,

    /// Environment variable holding the password.
    pub password_env: String,

    /// Page unauthenticated browsers are redirected to.
    pub login_path: String,

    /// Resolved from `password_env` at load time.
    #[serde(skip)]
    pub password: Option<Secret>,
}

impl GateSettings {
    fn preview() -> Self {
        Self {
            enabled: true,
            cookie_name: "preview_auth".to_string(),
            password_env: "PREVIEW_PASSWORD".to_string(),
            login_path: "/password".to_string(),
            password: None,
        }
    }

    fn admin() -> Self {
        Self {
            enabled: true,
            cookie_name: "admin_auth".to_string(),
            password_env: "ADMIN_PASSWORD".to_string(),
            login_path: "/admin/login".to_string(),
            password: None,
        }
    }
}

impl Default for GateSettings {
    fn default() -> Self {
        Self::preview()
    }
}

/// Both password gates.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    pub preview: GateSettings,
    pub admin: GateSettings,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            preview: GateSettings::preview(),
            admin: GateSettings::admin(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Interval of the background sweep of expired entries (0 disables).
    pub sweep_interval_secs: u64,

    /// Limiter definitions, referenced by name from routes.
    pub limiters: Vec<LimiterConfig>,
}

impl RateLimitConfig {
    fn standard() -> Self {
        Self {
            limiters: vec![
                LimiterConfig {
                    name: "api".to_string(),
                    limit: 60,
                    window_ms: 60_000,
                },
                LimiterConfig {
                    name: "admin".to_string(),
                    limit: 30,
                    window_ms: 60_000,
                },
            ],
            ..Self::default()
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 60,
            limiters: Vec::new(),
        }
    }
}

/// A single named limiter: `limit` requests per `window_ms`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimiterConfig {
    pub name: String,
    pub limit: u32,
    pub window_ms: u64,
}

/// Route policy mapping a path prefix to admission checks.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Path prefix to match. `None` matches every path.
    #[serde(default)]
    pub path_prefix: Option<String>,

    /// Validate the Origin header against the allow-list.
    #[serde(default)]
    pub cors: bool,

    /// Name of the limiter applied to this route.
    #[serde(default)]
    pub rate_limit: Option<String>,

    /// Gate requiring a session.
    #[serde(default)]
    pub gate: Option<GateKind>,

    /// What an unauthenticated caller receives.
    #[serde(default)]
    pub challenge: Challenge,

    /// Route priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,
}

impl RouteConfig {
    fn standard() -> Vec<Self> {
        vec![
            RouteConfig {
                name: "admin-api".to_string(),
                path_prefix: Some("/api/admin".to_string()),
                cors: true,
                rate_limit: Some("admin".to_string()),
                gate: Some(GateKind::Admin),
                challenge: Challenge::Unauthorized,
                priority: 30,
            },
            RouteConfig {
                name: "admin".to_string(),
                path_prefix: Some("/admin".to_string()),
                cors: false,
                rate_limit: None,
                gate: Some(GateKind::Admin),
                challenge: Challenge::Redirect,
                priority: 20,
            },
            RouteConfig {
                name: "api".to_string(),
                path_prefix: Some("/api".to_string()),
                cors: true,
                rate_limit: Some("api".to_string()),
                gate: Some(GateKind::Preview),
                challenge: Challenge::Unauthorized,
                priority: 10,
            },
            RouteConfig {
                name: "site".to_string(),
                path_prefix: None,
                cors: false,
                rate_limit: None,
                gate: Some(GateKind::Preview),
                challenge: Challenge::Redirect,
                priority: 0,
            },
        ]
    }
}

/// Paths never subject to the admission pipeline.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BypassConfig {
    /// Exact paths (SEO files, login pages).
    pub exact: Vec<String>,

    /// Path prefixes (auth endpoints, webhooks, asset directories).
    pub prefixes: Vec<String>,

    /// Static file extensions, without the dot.
    pub extensions: Vec<String>,
}

impl BypassConfig {
    fn standard() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            exact: owned(&[
                "/robots.txt",
                "/sitemap.xml",
                "/favicon.ico",
                "/password",
                "/admin/login",
            ]),
            prefixes: owned(&[
                "/api/auth/",
                "/api/admin/auth/",
                "/api/webhooks/",
                "/_next/",
                "/static/",
                "/_gate/",
            ]),
            extensions: owned(&[
                "css", "js", "map", "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "avif",
                "woff", "woff2", "ttf",
            ]),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security response headers.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: GateConfig = toml::from_str(
            r#"
            environment = "development"

            [listener]
            bind_address = "127.0.0.1:9000"

            [[rate_limit.limiters]]
            name = "api"
            limit = 5
            window_ms = 60000
            "#,
        )
        .unwrap();

        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.rate_limit.limiters.len(), 1);
        assert_eq!(config.rate_limit.sweep_interval_secs, 60);
        assert_eq!(config.auth.admin.cookie_name, "admin_auth");
        assert!(config.routes.is_empty());
    }

    #[test]
    fn test_route_gate_and_challenge_parse() {
        let config: GateConfig = toml::from_str(
            r#"
            [[routes]]
            name = "admin-api"
            path_prefix = "/api/admin"
            gate = "admin"
            challenge = "unauthorized"
            "#,
        )
        .unwrap();

        let route = &config.routes[0];
        assert_eq!(route.gate, Some(GateKind::Admin));
        assert_eq!(route.challenge, Challenge::Unauthorized);
        assert!(!route.cors);
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new("mindmuscle2025");
        assert!(!format!("{:?}", secret).contains("mindmuscle2025"));
    }

    #[test]
    fn test_standard_config_covers_seo_files() {
        let config = GateConfig::standard();
        assert!(config.bypass.exact.iter().any(|p| p == "/robots.txt"));
        assert!(config.bypass.exact.iter().any(|p| p == "/sitemap.xml"));
        assert_eq!(config.routes.len(), 4);
    }
}
