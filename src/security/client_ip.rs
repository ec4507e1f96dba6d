//! Caller identity from proxy/CDN headers.
//!
//! Headers are checked in order and the first usable one wins:
//! 1. `X-Forwarded-For` (first entry, the original client per the nearest proxy)
//! 2. `CF-Connecting-IP`
//! 3. `X-Real-IP`
//!
//! With none present the caller is `"unknown"`. All such callers share one
//! rate-limit bucket.

use axum::http::HeaderMap;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";
pub const X_REAL_IP: &str = "x-real-ip";

pub const UNKNOWN_CLIENT: &str = "unknown";

/// Resolve the caller identifier. Never fails.
pub fn resolve(headers: &HeaderMap) -> String {
    forwarded_for(headers)
        .or_else(|| single_value(headers, CF_CONNECTING_IP))
        .or_else(|| single_value(headers, X_REAL_IP))
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

fn forwarded_for(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(X_FORWARDED_FOR)?.to_str().ok()?;
    // "client, proxy1, proxy2"
    let first = value.split(',').next()?.trim();
    (!first.is_empty()).then_some(first)
}

fn single_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let value = headers.get(name)?.to_str().ok()?.trim();
    (!value.is_empty()).then_some(value)
}
