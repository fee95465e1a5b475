// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dim_core::Priority;

#[tokio::test]
async fn fifo_within_a_band() {
    let q: JobQueue<&str> = JobQueue::new(10);
    q.enqueue(Priority::Normal, "first").await.unwrap();
    q.enqueue(Priority::Normal, "second").await.unwrap();
    assert_eq!(q.dequeue().await, "first");
    assert_eq!(q.dequeue().await, "second");
}

#[tokio::test]
async fn high_priority_preempts_normal_and_low() {
    let q: JobQueue<&str> = JobQueue::new(10);
    q.enqueue(Priority::Low, "low").await.unwrap();
    q.enqueue(Priority::Normal, "normal").await.unwrap();
    q.enqueue(Priority::High, "high").await.unwrap();
    assert_eq!(q.dequeue().await, "high");
    assert_eq!(q.dequeue().await, "normal");
    assert_eq!(q.dequeue().await, "low");
}

#[tokio::test]
async fn enqueue_fails_past_max_size() {
    let q: JobQueue<&str> = JobQueue::new(1);
    q.enqueue(Priority::Normal, "a").await.unwrap();
    assert_eq!(q.enqueue(Priority::Normal, "b").await, Err(QueueFullError(1)));
}

#[tokio::test]
async fn try_dequeue_is_none_when_empty() {
    let q: JobQueue<&str> = JobQueue::new(10);
    assert_eq!(q.try_dequeue().await, None);
}

#[tokio::test]
async fn dequeue_blocks_until_enqueue_wakes_it() {
    use std::sync::Arc;
    let q = Arc::new(JobQueue::<&str>::new(10));
    let q2 = q.clone();
    let handle = tokio::spawn(async move { q2.dequeue().await });
    tokio::task::yield_now().await;
    q.enqueue(Priority::Normal, "woken").await.unwrap();
    let item = tokio::time::timeout(std::time::Duration::from_secs(1), handle).await.unwrap().unwrap();
    assert_eq!(item, "woken");
}

#[tokio::test]
async fn remove_drops_item_from_its_band() {
    let q: JobQueue<&str> = JobQueue::new(10);
    q.enqueue(Priority::Low, "a").await.unwrap();
    q.enqueue(Priority::Low, "b").await.unwrap();
    assert!(q.remove(&"a").await);
    assert_eq!(q.dequeue().await, "b");
}

#[tokio::test]
async fn tracked_queue_reports_queued_membership() {
    let q: TrackedJobQueue<&str> = TrackedJobQueue::new(10);
    q.enqueue(Priority::Normal, "job-1".to_string(), "payload").await.unwrap();
    assert!(q.is_queued("job-1").await);
    let _ = q.dequeue().await;
    q.mark_dequeued("job-1").await;
    assert!(!q.is_queued("job-1").await);
}
