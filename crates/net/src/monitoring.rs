// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory metrics: counters, gauges, histograms, and timers.
//!
//! Every metric is keyed by `name + sorted(tag=value)` so two calls with the
//! same name but different tag sets land in distinct series. Percentiles are
//! computed over a bounded trailing window rather than the full history.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::Duration;

const WINDOW_SIZE: usize = 1000;

pub type Tags = BTreeMap<String, String>;

fn series_key(name: &str, tags: &Tags) -> String {
    if tags.is_empty() {
        return name.to_string();
    }
    let joined = tags.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(",");
    format!("{name}{{{joined}}}")
}

#[derive(Default)]
struct Sampled {
    samples: Vec<f64>,
}

impl Sampled {
    fn push(&mut self, value: f64) {
        if self.samples.len() == WINDOW_SIZE {
            self.samples.remove(0);
        }
        self.samples.push(value);
    }

    fn percentile(&self, p: f64) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mut sorted = self.samples.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let rank = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
        sorted[rank.min(sorted.len() - 1)]
    }
}

/// Snapshot of a histogram/timer series' percentiles, for `get_metrics`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Percentiles {
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    pub count: usize,
}

#[derive(Default)]
struct Registry {
    counters: BTreeMap<String, i64>,
    gauges: BTreeMap<String, f64>,
    histograms: BTreeMap<String, Sampled>,
    timers: BTreeMap<String, Sampled>,
}

/// Pure in-memory metrics registry. Cheap to clone and share across tasks.
#[derive(Clone, Default)]
pub struct Monitoring {
    inner: std::sync::Arc<Mutex<Registry>>,
}

impl Monitoring {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self, name: &str, tags: &Tags, delta: i64) {
        let key = series_key(name, tags);
        *self.inner.lock().counters.entry(key).or_insert(0) += delta;
    }

    pub fn gauge(&self, name: &str, tags: &Tags, value: f64) {
        let key = series_key(name, tags);
        self.inner.lock().gauges.insert(key, value);
    }

    pub fn histogram(&self, name: &str, tags: &Tags, value: f64) {
        let key = series_key(name, tags);
        self.inner.lock().histograms.entry(key).or_default().push(value);
    }

    pub fn timer(&self, name: &str, tags: &Tags, elapsed: Duration) {
        let key = series_key(name, tags);
        self.inner.lock().timers.entry(key).or_default().push(elapsed.as_secs_f64() * 1000.0);
    }

    pub fn counter_value(&self, name: &str, tags: &Tags) -> i64 {
        let key = series_key(name, tags);
        self.inner.lock().counters.get(&key).copied().unwrap_or(0)
    }

    pub fn gauge_value(&self, name: &str, tags: &Tags) -> Option<f64> {
        let key = series_key(name, tags);
        self.inner.lock().gauges.get(&key).copied()
    }

    pub fn histogram_percentiles(&self, name: &str, tags: &Tags) -> Percentiles {
        let key = series_key(name, tags);
        let guard = self.inner.lock();
        let sampled = guard.histograms.get(&key);
        Self::percentiles_of(sampled)
    }

    pub fn timer_percentiles(&self, name: &str, tags: &Tags) -> Percentiles {
        let key = series_key(name, tags);
        let guard = self.inner.lock();
        let sampled = guard.timers.get(&key);
        Self::percentiles_of(sampled)
    }

    fn percentiles_of(sampled: Option<&Sampled>) -> Percentiles {
        match sampled {
            Some(s) => Percentiles { p50: s.percentile(50.0), p95: s.percentile(95.0), p99: s.percentile(99.0), count: s.samples.len() },
            None => Percentiles { p50: 0.0, p95: 0.0, p99: 0.0, count: 0 },
        }
    }
}

#[cfg(test)]
#[path = "monitoring_tests.rs"]
mod tests;
