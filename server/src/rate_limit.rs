//! Fixed-window, per-key request limits.
//!
//! The default limiter keeps counters in process memory, so limits are per
//! server instance. `RateLimits` holds trait objects so a shared backend can
//! replace it.

use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Recipe submissions: 5 per minute per user.
pub const SUBMISSION_LIMIT: RateLimit = RateLimit {
    max_requests: 5,
    window: Duration::from_secs(60),
};

/// Ingredient suggestions: 30 per 10 seconds per user.
pub const SUGGEST_LIMIT: RateLimit = RateLimit {
    max_requests: 30,
    window: Duration::from_secs(10),
};

/// How often the background task drops expired windows.
pub const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max_requests: u32,
    pub window: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Denied { retry_after: Duration },
}

impl RateDecision {
    /// Whole seconds for a `Retry-After` header, never zero.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            RateDecision::Allowed => None,
            RateDecision::Denied { retry_after } => {
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                Some(secs.max(1))
            }
        }
    }
}

pub trait RateLimiter: Send + Sync {
    fn check(&self, key: &str) -> RateDecision;

    /// Drop state that can no longer affect a decision.
    fn prune(&self) {}
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

pub struct InMemoryRateLimiter {
    limit: RateLimit,
    windows: DashMap<String, Window>,
}

impl InMemoryRateLimiter {
    pub fn new(limit: RateLimit) -> Self {
        Self {
            limit,
            windows: DashMap::new(),
        }
    }

    /// Count one request for `key` at `now`. The entry lock makes the
    /// read-modify-write atomic per key.
    pub fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        let mut window = self.windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            reset_at: now + self.limit.window,
        });

        if now >= window.reset_at {
            window.count = 0;
            window.reset_at = now + self.limit.window;
        }

        if window.count >= self.limit.max_requests {
            return RateDecision::Denied {
                retry_after: window.reset_at.saturating_duration_since(now),
            };
        }

        window.count += 1;
        RateDecision::Allowed
    }

    /// Drop windows that have expired by `now`.
    pub fn prune_at(&self, now: Instant) {
        self.windows.retain(|_, window| window.reset_at > now);
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

impl RateLimiter for InMemoryRateLimiter {
    fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }

    fn prune(&self) {
        self.prune_at(Instant::now());
    }
}

/// One limiter per rate-limited route.
pub struct RateLimits {
    pub submissions: Box<dyn RateLimiter>,
    pub suggestions: Box<dyn RateLimiter>,
}

impl RateLimits {
    pub fn new(submissions: Box<dyn RateLimiter>, suggestions: Box<dyn RateLimiter>) -> Self {
        Self {
            submissions,
            suggestions,
        }
    }

    pub fn prune(&self) {
        self.submissions.prune();
        self.suggestions.prune();
    }
}

impl Default for RateLimits {
    fn default() -> Self {
        Self::new(
            Box::new(InMemoryRateLimiter::new(SUBMISSION_LIMIT)),
            Box::new(InMemoryRateLimiter::new(SUGGEST_LIMIT)),
        )
    }
}
