//! Fixed-interval request counter per identifier.
//!
//! Counts are window-relative: each identifier gets a window starting at its
//! first request, and the count resets once that window expires. A burst at
//! the end of one window followed by one at the start of the next can exceed
//! the nominal rate over a short span.

use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Tracked identifiers above which a check first sweeps expired entries.
pub const SWEEP_THRESHOLD: usize = 1000;

/// Per-identifier window state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    /// Requests seen in the current window (always >= 1).
    pub count: u32,
    /// Instant the window expires.
    pub reset_at: Instant,
}

impl RateLimitEntry {
    fn fresh(now: Instant, window: Duration) -> Self {
        Self {
            count: 1,
            reset_at: now + window,
        }
    }

    /// An entry is expired once `now >= reset_at`, removed or not.
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.reset_at
    }
}

/// Result of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub limited: bool,
    pub remaining: u32,
    pub reset_at: Instant,
    pub limit: u32,
}

impl RateLimitDecision {
    /// Whole seconds until the window resets, rounded up.
    pub fn retry_after_secs(&self, now: Instant) -> u64 {
        let millis = self.reset_at.saturating_duration_since(now).as_millis();
        let secs = u64::try_from(millis.div_ceil(1000)).unwrap_or(u64::MAX);
        if self.limited {
            secs.max(1)
        } else {
            secs
        }
    }
}

/// Concurrent identifier → entry map with a fixed `(limit, window)` policy.
///
/// The entry for one identifier is updated under its shard lock, so the
/// increment-and-compare is atomic with respect to concurrent requests from
/// the same caller.
#[derive(Debug)]
pub struct SlidingWindowCounter {
    entries: DashMap<String, RateLimitEntry>,
    limit: u32,
    window: Duration,
}

impl SlidingWindowCounter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            limit,
            window,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of identifiers currently tracked, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count one request from `identifier` at `now`.
    pub fn check_at(&self, identifier: &str, now: Instant) -> RateLimitDecision {
        if self.entries.len() > SWEEP_THRESHOLD {
            self.sweep_at(now);
        }

        let entry = match self.entries.entry(identifier.to_owned()) {
            Entry::Vacant(vacant) => *vacant.insert(RateLimitEntry::fresh(now, self.window)),
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if entry.is_expired(now) {
                    *entry = RateLimitEntry::fresh(now, self.window);
                } else {
                    entry.count = entry.count.saturating_add(1);
                }
                *entry
            }
        };

        let limited = entry.count > self.limit;
        RateLimitDecision {
            limited,
            remaining: if limited { 0 } else { self.limit - entry.count },
            reset_at: entry.reset_at,
            limit: self.limit,
        }
    }

    /// Drop every entry whose window has passed. Returns how many were removed.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Current entry for an identifier, if tracked.
    pub fn entry(&self, identifier: &str) -> Option<RateLimitEntry> {
        self.entries.get(identifier).map(|e| *e)
    }
}
