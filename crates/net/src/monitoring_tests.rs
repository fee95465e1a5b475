// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn counter_accumulates_across_calls() {
    let m = Monitoring::new();
    let t = Tags::new();
    m.increment("jobs.submitted", &t, 1);
    m.increment("jobs.submitted", &t, 1);
    assert_eq!(m.counter_value("jobs.submitted", &t), 2);
}

#[test]
fn distinct_tag_sets_are_distinct_series() {
    let m = Monitoring::new();
    let a = tags(&[("pattern", "collaborative")]);
    let b = tags(&[("pattern", "chained")]);
    m.increment("jobs.submitted", &a, 5);
    m.increment("jobs.submitted", &b, 1);
    assert_eq!(m.counter_value("jobs.submitted", &a), 5);
    assert_eq!(m.counter_value("jobs.submitted", &b), 1);
}

#[test]
fn gauge_reports_last_value() {
    let m = Monitoring::new();
    let t = Tags::new();
    m.gauge("cpu_percent", &t, 10.0);
    m.gauge("cpu_percent", &t, 20.0);
    assert_eq!(m.gauge_value("cpu_percent", &t), Some(20.0));
}

#[test]
fn histogram_percentiles_over_uniform_samples() {
    let m = Monitoring::new();
    let t = Tags::new();
    for i in 1..=100 {
        m.histogram("latency_ms", &t, i as f64);
    }
    let p = m.histogram_percentiles("latency_ms", &t);
    assert_eq!(p.count, 100);
    assert!((p.p50 - 50.0).abs() <= 2.0);
    assert!((p.p99 - 99.0).abs() <= 2.0);
}

#[test]
fn window_is_bounded_to_last_1000_samples() {
    let m = Monitoring::new();
    let t = Tags::new();
    for i in 0..1500 {
        m.histogram("x", &t, i as f64);
    }
    let p = m.histogram_percentiles("x", &t);
    assert_eq!(p.count, 1000);
}

#[test]
fn timer_records_elapsed_milliseconds() {
    let m = Monitoring::new();
    let t = Tags::new();
    m.timer("agent.run", &t, std::time::Duration::from_millis(250));
    let p = m.timer_percentiles("agent.run", &t);
    assert_eq!(p.count, 1);
    assert!((p.p50 - 250.0).abs() < 1.0);
}
