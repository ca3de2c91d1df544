use std::{
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use metrics::counter;
use moka::{policy::EvictionPolicy, sync::Cache};
use tracing::debug;

use crate::config::{GatewayConfig, DEFAULT_RATE_LIMIT_MAX_REQUESTS, DEFAULT_RATE_LIMIT_WINDOW};

/// Fixed-window quota applied to every client key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_points: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            max_points: config.rate_limit_max_requests(),
            window: config.rate_limit_window(),
        }
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_points: DEFAULT_RATE_LIMIT_MAX_REQUESTS,
            window: DEFAULT_RATE_LIMIT_WINDOW,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed { remaining: u32 },
    Rejected { retry_after: Duration },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Per-client counter. `remaining` stays within `[0, max_points]`.
#[derive(Debug)]
struct QuotaWindow {
    remaining: u32,
    window_start: Instant,
}

/// In-memory fixed-window limiter keyed by client identifier.
///
/// Each key owns its own mutex, so the check-and-consume step is atomic per
/// key while distinct clients never contend. Entries idle for a whole window
/// are evicted; an evicted key would have been reset on its next call anyway.
/// The table is LRU-bounded: a new key is always stored, displacing the
/// least recently seen client.
#[derive(Clone)]
pub struct RateLimiter {
    policy: RateLimitPolicy,
    quotas: Cache<String, Arc<Mutex<QuotaWindow>>>,
}

impl RateLimiter {
    pub const DEFAULT_CAPACITY: u64 = 100_000;

    pub fn new(policy: RateLimitPolicy) -> Self {
        Self::with_capacity(policy, Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(policy: RateLimitPolicy, capacity: u64) -> Self {
        let policy = RateLimitPolicy {
            max_points: policy.max_points.max(1),
            window: policy.window.max(Duration::from_millis(1)),
        };
        Self {
            policy,
            quotas: Cache::builder()
                .time_to_idle(policy.window)
                .max_capacity(capacity.max(1))
                .eviction_policy(EvictionPolicy::lru())
                .build(),
        }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    pub fn admit(&self, key: &str) -> Admission {
        self.admit_at(key, Instant::now())
    }

    /// Consumes one point for `key` as of `now`, refilling the quota first if
    /// the key's window has elapsed.
    pub fn admit_at(&self, key: &str, now: Instant) -> Admission {
        let max_points = self.policy.max_points;
        let slot = self.quotas.get_with_by_ref(key, || {
            Arc::new(Mutex::new(QuotaWindow {
                remaining: max_points,
                window_start: now,
            }))
        });

        let mut quota = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if now.saturating_duration_since(quota.window_start) >= self.policy.window {
            quota.remaining = max_points;
            quota.window_start = now;
        }

        if quota.remaining > 0 {
            quota.remaining -= 1;
            counter!("api_rate_limit_decisions_total", "decision" => "allowed").increment(1);
            Admission::Allowed {
                remaining: quota.remaining,
            }
        } else {
            let retry_after =
                (quota.window_start + self.policy.window).saturating_duration_since(now);
            counter!("api_rate_limit_decisions_total", "decision" => "rejected").increment(1);
            debug!(client = key, ?retry_after, "rate limit exhausted");
            Admission::Rejected { retry_after }
        }
    }

    /// Number of client keys currently tracked.
    pub fn tracked_clients(&self) -> u64 {
        self.quotas.run_pending_tasks();
        self.quotas.entry_count()
    }
}
