use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::ApiRateLimitSettings;

/// Every this many checks, buckets with no hit inside the window are dropped.
const SWEEP_EVERY: u64 = 256;

/// Outcome of one rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited,
}

/// Sliding-window limiter keyed by caller and route.
#[derive(Debug, Clone)]
pub struct ApiRateLimiter {
    window: Duration,
    max_requests: NonZeroU32,
    buckets: Arc<DashMap<String, Vec<Instant>>>,
    checks: Arc<AtomicU64>,
}

impl ApiRateLimiter {
    pub fn new(window: Duration, max_requests: NonZeroU32) -> Self {
        Self {
            window,
            max_requests,
            buckets: Arc::new(DashMap::new()),
            checks: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn from_settings(settings: &ApiRateLimitSettings) -> Self {
        Self::new(
            Duration::from_secs(settings.window_seconds.get().into()),
            settings.max_requests,
        )
    }

    pub fn check(&self, caller: &str, route: &str) -> RateDecision {
        self.check_at(caller, route, Instant::now())
    }

    fn check_at(&self, caller: &str, route: &str, now: Instant) -> RateDecision {
        let decision = self.record(caller, route, now);
        if self.checks.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.sweep(now);
        }
        decision
    }

    fn record(&self, caller: &str, route: &str, now: Instant) -> RateDecision {
        let window = self.window;
        let mut entry = self.buckets.entry(format!("{caller}:{route}")).or_default();
        entry.retain(|seen| now.saturating_duration_since(*seen) < window);

        let used = u32::try_from(entry.len()).unwrap_or(u32::MAX);
        let remaining = self.max_requests.get().saturating_sub(used);
        if remaining == 0 {
            return RateDecision::Limited;
        }

        entry.push(now);
        RateDecision::Allowed {
            remaining: remaining - 1,
        }
    }

    /// Drop expired hits and remove buckets left empty.
    fn sweep(&self, now: Instant) {
        let window = self.window;
        self.buckets.retain(|_, hits| {
            hits.retain(|seen| now.saturating_duration_since(*seen) < window);
            !hits.is_empty()
        });
    }

    #[cfg(test)]
    fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn retry_after_secs(&self) -> u64 {
        self.window.as_secs().max(1)
    }

    pub fn limit(&self) -> u32 {
        self.max_requests.get()
    }
}
