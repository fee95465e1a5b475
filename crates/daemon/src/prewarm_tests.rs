// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::model_cache::ModelCacheError;
use async_trait::async_trait;
use dim_core::FakeClock;

struct StubFetcher;

#[async_trait]
impl ModelFetcher for StubFetcher {
    async fn fetch(&self, _model_id: &str) -> Result<Vec<u8>, ModelCacheError> {
        Ok(vec![1, 2, 3])
    }
}

#[test]
fn access_count_decays_outside_window() {
    let clock = FakeClock::new();
    let tracker = AccessTracker::new(clock.clone(), Duration::from_secs(60));
    tracker.record("m1");
    tracker.record("m1");
    assert_eq!(tracker.count("m1"), 2);

    clock.advance(Duration::from_secs(120));
    assert_eq!(tracker.count("m1"), 0);
}

#[test]
fn popular_lists_models_at_or_above_threshold() {
    let clock = FakeClock::new();
    let tracker = AccessTracker::new(clock, Duration::from_secs(3600));
    for _ in 0..5 {
        tracker.record("hot");
    }
    tracker.record("cold");
    assert_eq!(tracker.popular(5), vec!["hot".to_string()]);
}

#[tokio::test]
async fn disabled_prewarmer_fetches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let cache = Arc::new(ModelCache::new(dir.path(), 1_000_000, StubFetcher, clock.clone()));
    let tracker = Arc::new(AccessTracker::new(clock, Duration::from_secs(3600)));

    let prewarmer = Prewarmer::new(false, vec!["m1".to_string()], 5, cache.clone(), tracker);
    prewarmer.run_once().await;
    assert!(!cache.contains("m1"));
}

#[tokio::test]
async fn enabled_prewarmer_fetches_configured_and_popular_models() {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let cache = Arc::new(ModelCache::new(dir.path(), 1_000_000, StubFetcher, clock.clone()));
    let tracker = Arc::new(AccessTracker::new(clock, Duration::from_secs(3600)));
    for _ in 0..5 {
        tracker.record("hot");
    }

    let prewarmer = Prewarmer::new(true, vec!["configured".to_string()], 5, cache.clone(), tracker);
    prewarmer.run_once().await;

    assert!(cache.contains("configured"));
    assert!(cache.contains("hot"));
}
