//! Per-route-family rate limiting.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use tokio::sync::broadcast;
use tokio::time;

use crate::config::LimiterConfig;
use crate::observability::metrics;
use crate::security::window::SlidingWindowCounter;

pub use crate::security::window::RateLimitDecision;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// A named `(limit, window)` policy protecting one route family.
///
/// State lives only in this process: a restart forgets every window, and
/// several gate processes each enforce their own quota.
#[derive(Debug)]
pub struct RateLimiter {
    name: String,
    counter: SlidingWindowCounter,
}

impl RateLimiter {
    pub fn new(name: impl Into<String>, limit: u32, window: Duration) -> Self {
        Self {
            name: name.into(),
            counter: SlidingWindowCounter::new(limit, window),
        }
    }

    pub fn from_config(config: &LimiterConfig) -> Self {
        Self::new(
            config.name.clone(),
            config.limit,
            Duration::from_millis(config.window_ms),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn limit(&self) -> u32 {
        self.counter.limit()
    }

    pub fn window(&self) -> Duration {
        self.counter.window()
    }

    /// Count one request from `identifier` now.
    pub fn check(&self, identifier: &str) -> RateLimitDecision {
        self.check_at(identifier, Instant::now())
    }

    pub fn check_at(&self, identifier: &str, now: Instant) -> RateLimitDecision {
        self.counter.check_at(identifier, now)
    }

    pub fn tracked(&self) -> usize {
        self.counter.len()
    }

    pub fn sweep_expired(&self) -> usize {
        self.counter.sweep_at(Instant::now())
    }
}

/// All configured limiters, keyed by name.
#[derive(Debug, Default)]
pub struct LimiterRegistry {
    limiters: HashMap<String, Arc<RateLimiter>>,
}

impl LimiterRegistry {
    pub fn from_config(configs: &[LimiterConfig]) -> Self {
        let limiters = configs
            .iter()
            .map(|c| (c.name.clone(), Arc::new(RateLimiter::from_config(c))))
            .collect();
        Self { limiters }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<RateLimiter>> {
        self.limiters.get(name)
    }

    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }

    /// Sweep expired entries from every limiter. Returns total removed.
    pub fn sweep_expired(&self) -> usize {
        self.limiters
            .values()
            .map(|limiter| {
                let removed = limiter.sweep_expired();
                metrics::record_tracked_identifiers(limiter.name(), limiter.tracked());
                removed
            })
            .sum()
    }

    /// Periodically sweep until shutdown is signalled.
    pub async fn run_janitor(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        if interval.is_zero() || self.is_empty() {
            tracing::info!("Rate limit janitor disabled");
            return;
        }

        tracing::info!(interval_secs = interval.as_secs(), "Rate limit janitor starting");

        let mut ticker = time::interval(interval);
        // The first tick completes immediately; nothing to sweep yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.sweep_expired();
                    if removed > 0 {
                        tracing::debug!(removed, "Swept expired rate limit entries");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Rate limit janitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

/// Informational headers on an admitted response.
pub fn insert_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter_config(name: &str, limit: u32, window_ms: u64) -> LimiterConfig {
        LimiterConfig {
            name: name.to_string(),
            limit,
            window_ms,
        }
    }

    #[test]
    fn test_limiter_delegates_to_window() {
        let limiter = RateLimiter::from_config(&limiter_config("api", 5, 60_000));
        assert_eq!(limiter.window(), Duration::from_secs(60));

        let start = Instant::now();
        for i in 0..5u64 {
            let d = limiter.check_at("1.2.3.4", start + Duration::from_secs(2 * i));
            assert!(!d.limited);
        }
        let sixth = limiter.check_at("1.2.3.4", start + Duration::from_secs(10));
        assert!(sixth.limited);
        assert_eq!(sixth.limit, 5);
    }

    #[test]
    fn test_registry_instances_are_independent() {
        let registry = LimiterRegistry::from_config(&[
            limiter_config("api", 1, 60_000),
            limiter_config("admin", 1, 60_000),
        ]);
        assert_eq!(registry.len(), 2);

        let api = registry.get("api").unwrap();
        let admin = registry.get("admin").unwrap();
        assert!(!api.check("1.2.3.4").limited);
        assert!(api.check("1.2.3.4").limited);
        assert!(!admin.check("1.2.3.4").limited);
        assert!(registry.get("forms").is_none());
    }

    #[test]
    fn test_registry_sweep_removes_expired() {
        let registry = LimiterRegistry::from_config(&[limiter_config("short", 10, 1)]);
        let limiter = registry.get("short").unwrap();
        limiter.check_at("a", Instant::now() - Duration::from_secs(1));
        assert_eq!(limiter.tracked(), 1);

        assert_eq!(registry.sweep_expired(), 1);
        assert_eq!(limiter.tracked(), 0);
    }

    #[test]
    fn test_rate_limit_headers() {
        let mut headers = HeaderMap::new();
        let decision = RateLimitDecision {
            limited: false,
            remaining: 3,
            reset_at: Instant::now(),
            limit: 5,
        };
        insert_rate_limit_headers(&mut headers, &decision);
        assert_eq!(headers["x-ratelimit-limit"], "5");
        assert_eq!(headers["x-ratelimit-remaining"], "3");
    }

    #[tokio::test]
    async fn test_janitor_stops_on_shutdown() {
        let registry = Arc::new(LimiterRegistry::from_config(&[limiter_config("api", 1, 10)]));
        let (tx, rx) = broadcast::channel(1);

        let handle = tokio::spawn(registry.run_janitor(Duration::from_millis(10), rx));
        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("janitor did not stop")
            .unwrap();
    }
}
