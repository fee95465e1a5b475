// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dim_core::FakeClock;
use std::time::Duration;

#[test]
fn allows_requests_within_burst() {
    let limiter = RateLimiter::new(FakeClock::new(), 60.0, 10.0);
    for _ in 0..10 {
        assert!(limiter.check("user-1", 1.0).allowed);
    }
    assert!(!limiter.check("user-1", 1.0).allowed);
}

#[test]
fn refills_over_time() {
    let clock = FakeClock::new();
    let limiter = RateLimiter::new(clock.clone(), 60.0, 1.0);
    assert!(limiter.check("user-1", 1.0).allowed);
    assert!(!limiter.check("user-1", 1.0).allowed);
    clock.advance(Duration::from_secs(1));
    assert!(limiter.check("user-1", 1.0).allowed);
}

#[test]
fn denied_request_reports_retry_after() {
    let limiter = RateLimiter::new(FakeClock::new(), 60.0, 1.0);
    assert!(limiter.check("user-1", 1.0).allowed);
    let result = limiter.check("user-1", 1.0);
    assert!(!result.allowed);
    assert!(result.retry_after_seconds >= 1);
}

#[test]
fn per_id_override_is_honoured() {
    let limiter = RateLimiter::new(FakeClock::new(), 60.0, 1.0).with_override("vip", 600.0, 100.0);
    for _ in 0..50 {
        assert!(limiter.check("vip", 1.0).allowed);
    }
    assert!(limiter.check("default-user", 1.0).allowed);
    assert!(!limiter.check("default-user", 1.0).allowed);
}

#[test]
fn status_reports_available_tokens_without_consuming() {
    let limiter = RateLimiter::new(FakeClock::new(), 60.0, 5.0);
    let before = limiter.status("user-1");
    assert_eq!(before.tokens_available, 5.0);
    assert!(limiter.check("user-1", 2.0).allowed);
    let after = limiter.status("user-1");
    assert_eq!(after.tokens_available, 3.0);
}
