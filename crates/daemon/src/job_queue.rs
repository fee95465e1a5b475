// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Three-band priority FIFO with blocking dequeue.
//!
//! Dequeue order is priority-major, FIFO-minor within a band; there is no
//! starvation prevention between bands — intentional, per the core contract.

use dim_core::Priority;
use std::collections::{HashSet, VecDeque};
use tokio::sync::{Mutex, Notify};

struct Bands<T> {
    high: VecDeque<T>,
    normal: VecDeque<T>,
    low: VecDeque<T>,
}

impl<T> Default for Bands<T> {
    fn default() -> Self {
        Self { high: VecDeque::new(), normal: VecDeque::new(), low: VecDeque::new() }
    }
}

impl<T> Bands<T> {
    fn band_mut(&mut self, priority: Priority) -> &mut VecDeque<T> {
        match priority {
            Priority::High => &mut self.high,
            Priority::Normal => &mut self.normal,
            Priority::Low => &mut self.low,
        }
    }

    fn len(&self) -> usize {
        self.high.len() + self.normal.len() + self.low.len()
    }

    fn pop_highest(&mut self) -> Option<T> {
        self.high.pop_front().or_else(|| self.normal.pop_front()).or_else(|| self.low.pop_front())
    }
}

/// Bounded, priority-ordered job queue. Cloning shares the same underlying
/// state (cheap, `Arc`-backed).
pub struct JobQueue<T> {
    bands: Mutex<Bands<T>>,
    notify: Notify,
    max_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("queue full (max_size={0})")]
pub struct QueueFullError(pub usize);

impl<T> JobQueue<T> {
    pub fn new(max_size: usize) -> Self {
        Self { bands: Mutex::new(Bands::default()), notify: Notify::new(), max_size }
    }

    pub async fn len(&self) -> usize {
        self.bands.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Enqueue `item` under `priority`, or fail with [`QueueFullError`] if
    /// the queue is already at capacity.
    pub async fn enqueue(&self, priority: Priority, item: T) -> Result<(), QueueFullError> {
        let mut bands = self.bands.lock().await;
        if bands.len() >= self.max_size {
            return Err(QueueFullError(self.max_size));
        }
        bands.band_mut(priority).push_back(item);
        drop(bands);
        self.notify.notify_one();
        Ok(())
    }

    /// Block until an item is available, then return the highest-priority
    /// one (FIFO within its band).
    pub async fn dequeue(&self) -> T {
        loop {
            {
                let mut bands = self.bands.lock().await;
                if let Some(item) = bands.pop_highest() {
                    return item;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Non-blocking dequeue; `None` if the queue is currently empty.
    pub async fn try_dequeue(&self) -> Option<T> {
        self.bands.lock().await.pop_highest()
    }
}

impl<T: PartialEq> JobQueue<T> {
    /// Remove one matching item from whichever band holds it. Used for
    /// `cancel_job` on a still-queued job.
    pub async fn remove(&self, item: &T) -> bool {
        let mut bands = self.bands.lock().await;
        for band in [&mut bands.high, &mut bands.normal, &mut bands.low] {
            if let Some(pos) = band.iter().position(|x| x == item) {
                band.remove(pos);
                return true;
            }
        }
        false
    }
}

/// Convenience wrapper tracking which job ids are currently queued, so
/// callers can answer "is this job still queued?" without scanning bands.
pub struct TrackedJobQueue<T> {
    queue: JobQueue<T>,
    queued_ids: Mutex<HashSet<String>>,
}

impl<T> TrackedJobQueue<T> {
    pub fn new(max_size: usize) -> Self {
        Self { queue: JobQueue::new(max_size), queued_ids: Mutex::new(HashSet::new()) }
    }

    pub async fn enqueue(&self, priority: Priority, id: String, item: T) -> Result<(), QueueFullError> {
        self.queue.enqueue(priority, item).await?;
        self.queued_ids.lock().await.insert(id);
        Ok(())
    }

    pub async fn dequeue(&self) -> T {
        self.queue.dequeue().await
    }

    pub async fn is_queued(&self, id: &str) -> bool {
        self.queued_ids.lock().await.contains(id)
    }

    pub async fn mark_dequeued(&self, id: &str) {
        self.queued_ids.lock().await.remove(id);
    }

    pub async fn len(&self) -> usize {
        self.queue.len().await
    }
}

impl<T: PartialEq> TrackedJobQueue<T> {
    /// Remove a still-queued item and drop its tracked id. Returns `false`
    /// if the item was already dequeued or never enqueued.
    pub async fn remove(&self, id: &str, item: &T) -> bool {
        let removed = self.queue.remove(item).await;
        if removed {
            self.queued_ids.lock().await.remove(id);
        }
        removed
    }
}

#[cfg(test)]
#[path = "job_queue_tests.rs"]
mod tests;
