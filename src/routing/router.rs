//! Route policy lookup.
//!
//! # Responsibilities
//! - Compile route and bypass configuration at startup
//! - Resolve the admission policy for a request path
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Exact and prefix bypass rules win over every route
//! - Extension bypass covers assets only outside prefixed routes, so
//!   `/api/admin/x.png` is still an admin API path
//! - Routes ordered by priority; ties keep declaration order
//! - No match resolves to an open policy rather than a rejection

use std::sync::Arc;

use crate::config::{BypassConfig, Challenge, GateKind, RouteConfig};
use crate::routing::matcher::{
    AnyMatcher, CatchAllMatcher, ExactPathMatcher, ExtensionMatcher, Matcher, PathPrefixMatcher,
};
use crate::security::rate_limit::{LimiterRegistry, RateLimiter};

/// Error compiling the policy table.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("route '{route}' references unknown limiter '{limiter}'")]
    UnknownLimiter { route: String, limiter: String },
}

/// Admission checks applied to one class of paths.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    pub name: String,
    /// Skip every admission stage.
    pub bypass: bool,
    /// Validate the Origin header.
    pub cors: bool,
    pub limiter: Option<Arc<RateLimiter>>,
    pub gate: Option<GateKind>,
    pub challenge: Challenge,
}

impl RoutePolicy {
    fn bypass() -> Self {
        Self {
            name: "bypass".to_string(),
            bypass: true,
            ..Self::open()
        }
    }

    fn open() -> Self {
        Self {
            name: "open".to_string(),
            bypass: false,
            cors: false,
            limiter: None,
            gate: None,
            challenge: Challenge::default(),
        }
    }
}

#[derive(Debug)]
struct CompiledRoute {
    matcher: Box<dyn Matcher>,
    /// Has a path prefix; asset extensions do not override it.
    scoped: bool,
    policy: RoutePolicy,
}

/// Compiled path → policy table.
#[derive(Debug)]
pub struct PolicyTable {
    bypass: AnyMatcher,
    assets: ExtensionMatcher,
    routes: Vec<CompiledRoute>,
    bypass_policy: RoutePolicy,
    open_policy: RoutePolicy,
}

impl PolicyTable {
    pub fn from_config(
        routes: &[RouteConfig],
        bypass: &BypassConfig,
        limiters: &LimiterRegistry,
    ) -> Result<Self, RoutingError> {
        let mut ordered: Vec<&RouteConfig> = routes.iter().collect();
        // Stable sort keeps declaration order among equal priorities.
        ordered.sort_by(|a, b| b.priority.cmp(&a.priority));

        let routes = ordered
            .into_iter()
            .map(|route| compile_route(route, limiters))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            bypass: compile_bypass(bypass),
            assets: ExtensionMatcher::new(&bypass.extensions),
            routes,
            bypass_policy: RoutePolicy::bypass(),
            open_policy: RoutePolicy::open(),
        })
    }

    /// Policy for a request path.
    pub fn resolve(&self, path: &str) -> &RoutePolicy {
        if self.bypass.matches(path) {
            return &self.bypass_policy;
        }
        let route = self.routes.iter().find(|route| route.matcher.matches(path));
        match route {
            Some(route) if route.scoped => &route.policy,
            _ if self.assets.matches(path) => &self.bypass_policy,
            Some(route) => &route.policy,
            None => &self.open_policy,
        }
    }
}

fn compile_route(
    route: &RouteConfig,
    limiters: &LimiterRegistry,
) -> Result<CompiledRoute, RoutingError> {
    let limiter = match &route.rate_limit {
        Some(name) => Some(
            limiters
                .get(name)
                .cloned()
                .ok_or_else(|| RoutingError::UnknownLimiter {
                    route: route.name.clone(),
                    limiter: name.clone(),
                })?,
        ),
        None => None,
    };

    let matcher: Box<dyn Matcher> = match &route.path_prefix {
        Some(prefix) => Box::new(PathPrefixMatcher::new(prefix.clone())),
        None => Box::new(CatchAllMatcher),
    };

    Ok(CompiledRoute {
        matcher,
        scoped: route.path_prefix.is_some(),
        policy: RoutePolicy {
            name: route.name.clone(),
            bypass: false,
            cors: route.cors,
            limiter,
            gate: route.gate,
            challenge: route.challenge,
        },
    })
}

fn compile_bypass(config: &BypassConfig) -> AnyMatcher {
    let mut matchers: Vec<Box<dyn Matcher>> = vec![Box::new(ExactPathMatcher::new(
        config.exact.iter().cloned(),
    ))];
    matchers.extend(
        config
            .prefixes
            .iter()
            .map(|p| Box::new(PathPrefixMatcher::new(p.clone())) as Box<dyn Matcher>),
    );
    AnyMatcher::new(matchers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateConfig;

    fn standard_table() -> PolicyTable {
        let config = GateConfig::standard();
        let limiters = LimiterRegistry::from_config(&config.rate_limit.limiters);
        PolicyTable::from_config(&config.routes, &config.bypass, &limiters).unwrap()
    }

    #[test]
    fn test_bypass_paths() {
        let table = standard_table();
        for path in [
            "/robots.txt",
            "/sitemap.xml",
            "/api/auth/login",
            "/api/admin/auth/logout",
            "/api/webhooks/stripe",
            "/_next/static/chunks/main.js",
            "/images/hero.webp",
            "/password",
        ] {
            assert!(table.resolve(path).bypass, "{} should bypass", path);
        }
    }

    #[test]
    fn test_asset_extension_does_not_open_prefixed_routes() {
        let table = standard_table();

        let admin_api = table.resolve("/api/admin/promo-codes.png");
        assert!(!admin_api.bypass);
        assert_eq!(admin_api.name, "admin-api");

        let admin = table.resolve("/admin/partners.css");
        assert!(!admin.bypass);
        assert_eq!(admin.gate, Some(GateKind::Admin));

        assert_eq!(table.resolve("/api/contact.js").name, "api");

        // Assets served from the site root or under the bypassed prefixes still pass.
        assert!(table.resolve("/logo.svg").bypass);
        assert!(table.resolve("/_next/static/chunk.js").bypass);
    }

    #[test]
    fn test_asset_extension_without_catch_all() {
        let limiters = LimiterRegistry::default();
        let bypass = BypassConfig {
            extensions: vec!["png".to_string()],
            ..BypassConfig::default()
        };
        let table = PolicyTable::from_config(&[], &bypass, &limiters).unwrap();

        assert!(table.resolve("/images/hero.png").bypass);
        assert_eq!(table.resolve("/pricing").name, "open");
    }

    #[test]
    fn test_priority_order() {
        let table = standard_table();

        let admin_api = table.resolve("/api/admin/promo-codes");
        assert_eq!(admin_api.name, "admin-api");
        assert_eq!(admin_api.gate, Some(GateKind::Admin));
        assert_eq!(admin_api.challenge, Challenge::Unauthorized);
        assert_eq!(admin_api.limiter.as_ref().map(|l| l.name()), Some("admin"));

        let api = table.resolve("/api/contact");
        assert_eq!(api.name, "api");
        assert!(api.cors);
        assert_eq!(api.gate, Some(GateKind::Preview));

        let admin = table.resolve("/admin/partners");
        assert_eq!(admin.name, "admin");
        assert_eq!(admin.challenge, Challenge::Redirect);

        let site = table.resolve("/pricing");
        assert_eq!(site.name, "site");
        assert!(site.limiter.is_none());
    }

    #[test]
    fn test_routes_share_limiter_instance() {
        let config = GateConfig::standard();
        let limiters = LimiterRegistry::from_config(&config.rate_limit.limiters);
        let table = PolicyTable::from_config(&config.routes, &config.bypass, &limiters).unwrap();

        let from_table = table.resolve("/api/contact").limiter.clone().unwrap();
        let from_registry = limiters.get("api").unwrap();
        assert!(Arc::ptr_eq(&from_table, from_registry));
    }

    #[test]
    fn test_no_match_is_open() {
        let limiters = LimiterRegistry::default();
        let routes = vec![RouteConfig {
            name: "api".to_string(),
            path_prefix: Some("/api".to_string()),
            cors: true,
            rate_limit: None,
            gate: None,
            challenge: Challenge::Unauthorized,
            priority: 0,
        }];
        let table =
            PolicyTable::from_config(&routes, &BypassConfig::default(), &limiters).unwrap();

        let policy = table.resolve("/pricing");
        assert_eq!(policy.name, "open");
        assert!(!policy.bypass && !policy.cors && policy.gate.is_none());
    }

    #[test]
    fn test_unknown_limiter_is_error() {
        let routes = vec![RouteConfig {
            name: "contact".to_string(),
            path_prefix: Some("/api/contact".to_string()),
            cors: false,
            rate_limit: Some("forms".to_string()),
            gate: None,
            challenge: Challenge::Unauthorized,
            priority: 0,
        }];
        let err = PolicyTable::from_config(
            &routes,
            &BypassConfig::default(),
            &LimiterRegistry::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RoutingError::UnknownLimiter { .. }));
    }
}
