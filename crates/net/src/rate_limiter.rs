// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token-bucket rate limiting, one bucket per identifier (typically a user id).

use dim_core::Clock;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct Limits {
    rate_per_minute: f64,
    burst_size: f64,
}

struct Bucket {
    tokens: f64,
    last_refill_ms: u64,
}

/// Outcome of a [`RateLimiter::check`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckResult {
    pub allowed: bool,
    pub retry_after_seconds: u64,
}

/// Point-in-time view of one identifier's bucket, for status introspection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketStatus {
    pub tokens_available: f64,
    pub burst_size: f64,
    pub rate_per_minute: f64,
}

/// Per-identifier token bucket rate limiter.
///
/// Refill is computed lazily on each [`check`](Self::check) call from
/// elapsed wall-clock time rather than via a background task, so the limiter
/// needs no polling loop and composes cleanly with a [`FakeClock`] in tests.
pub struct RateLimiter<C: Clock> {
    clock: C,
    default_limits: Limits,
    overrides: HashMap<String, Limits>,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl<C: Clock> RateLimiter<C> {
    pub fn new(clock: C, default_rate_per_minute: f64, default_burst_size: f64) -> Self {
        Self {
            clock,
            default_limits: Limits { rate_per_minute: default_rate_per_minute, burst_size: default_burst_size },
            overrides: HashMap::new(),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Override the rate/burst for a specific identifier (e.g. a premium user).
    pub fn with_override(mut self, id: impl Into<String>, rate_per_minute: f64, burst_size: f64) -> Self {
        self.overrides.insert(id.into(), Limits { rate_per_minute, burst_size });
        self
    }

    fn limits_for(&self, id: &str) -> Limits {
        self.overrides.get(id).copied().unwrap_or(self.default_limits)
    }

    /// Atomically refill then attempt to deduct `cost` tokens for `id`.
    pub fn check(&self, id: &str, cost: f64) -> CheckResult {
        let limits = self.limits_for(id);
        let now_ms = self.clock.epoch_ms();
        let mut guard = self.buckets.lock();
        let bucket = guard
            .entry(id.to_string())
            .or_insert_with(|| Bucket { tokens: limits.burst_size, last_refill_ms: now_ms });

        let elapsed_secs = now_ms.saturating_sub(bucket.last_refill_ms) as f64 / 1000.0;
        let refill_rate_per_sec = limits.rate_per_minute / 60.0;
        bucket.tokens = (bucket.tokens + elapsed_secs * refill_rate_per_sec).min(limits.burst_size);
        bucket.last_refill_ms = now_ms;

        if bucket.tokens >= cost {
            bucket.tokens -= cost;
            CheckResult { allowed: true, retry_after_seconds: 0 }
        } else {
            let deficit = cost - bucket.tokens;
            let retry_after_seconds = if refill_rate_per_sec > 0.0 {
                (deficit / refill_rate_per_sec).ceil() as u64
            } else {
                u64::MAX
            };
            CheckResult { allowed: false, retry_after_seconds }
        }
    }

    /// Current bucket state for `id`, without consuming any tokens.
    pub fn status(&self, id: &str) -> BucketStatus {
        let limits = self.limits_for(id);
        let now_ms = self.clock.epoch_ms();
        let guard = self.buckets.lock();
        let tokens_available = match guard.get(id) {
            Some(bucket) => {
                let elapsed_secs = now_ms.saturating_sub(bucket.last_refill_ms) as f64 / 1000.0;
                let refill_rate_per_sec = limits.rate_per_minute / 60.0;
                (bucket.tokens + elapsed_secs * refill_rate_per_sec).min(limits.burst_size)
            }
            None => limits.burst_size,
        };
        BucketStatus { tokens_available, burst_size: limits.burst_size, rate_per_minute: limits.rate_per_minute }
    }
}

#[cfg(test)]
#[path = "rate_limiter_tests.rs"]
mod tests;
