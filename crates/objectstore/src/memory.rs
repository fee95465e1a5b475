// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process object store backed by a `HashMap` and `tokio::sync::broadcast`
//! topics. Used by tests and by the reference single-node deployment; a
//! production deployment points the same [`ObjectStore`] trait at a real
//! content-addressed backend instead.

use crate::cid::Cid;
use crate::error::{StoreError, StoreResult};
use crate::store::{ObjectStore, Subscription};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

const TOPIC_CHANNEL_CAPACITY: usize = 1024;

struct NameRecord {
    cid: Cid,
    expires_at: Option<Instant>,
}

#[derive(Default)]
struct Inner {
    blobs: HashMap<Cid, Vec<u8>>,
    pinned: HashSet<Cid>,
    names: HashMap<String, NameRecord>,
    topics: HashMap<String, broadcast::Sender<Vec<u8>>>,
}

/// In-memory [`ObjectStore`]. Cheap to clone (all state lives behind an
/// `Arc`); share one instance across a daemon or orchestrator process.
#[derive(Clone, Default)]
pub struct InMemoryObjectStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn topic_sender(&self, topic: &str) -> broadcast::Sender<Vec<u8>> {
        let mut guard = self.inner.lock();
        guard
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CHANNEL_CAPACITY).0)
            .clone()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, bytes: Vec<u8>) -> StoreResult<Cid> {
        let cid = Cid::of(&bytes);
        self.inner.lock().blobs.insert(cid.clone(), bytes);
        Ok(cid)
    }

    async fn put_pinned(&self, bytes: Vec<u8>) -> StoreResult<Cid> {
        let cid = Cid::of(&bytes);
        let mut guard = self.inner.lock();
        guard.blobs.insert(cid.clone(), bytes);
        guard.pinned.insert(cid.clone());
        Ok(cid)
    }

    async fn get(&self, cid: &Cid) -> StoreResult<Vec<u8>> {
        self.inner.lock().blobs.get(cid).cloned().ok_or_else(|| StoreError::NotFound(cid.clone()))
    }

    async fn pin(&self, cid: &Cid) -> StoreResult<()> {
        let mut guard = self.inner.lock();
        if !guard.blobs.contains_key(cid) {
            return Err(StoreError::NotFound(cid.clone()));
        }
        guard.pinned.insert(cid.clone());
        Ok(())
    }

    async fn unpin(&self, cid: &Cid) -> StoreResult<()> {
        self.inner.lock().pinned.remove(cid);
        Ok(())
    }

    async fn publish(&self, topic: &str, bytes: Vec<u8>) -> StoreResult<()> {
        // A broadcast send errors only when there are zero receivers, which
        // is not a failure for a pub/sub publish.
        let _ = self.topic_sender(topic).send(bytes);
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> StoreResult<Subscription> {
        Ok(Subscription::new(self.topic_sender(topic).subscribe()))
    }

    async fn peers(&self, topic: &str) -> StoreResult<Vec<String>> {
        let guard = self.inner.lock();
        let count = guard.topics.get(topic).map(|tx| tx.receiver_count()).unwrap_or(0);
        Ok((0..count).map(|i| format!("local-subscriber-{i}")).collect())
    }

    async fn topics(&self) -> StoreResult<Vec<String>> {
        Ok(self.inner.lock().topics.keys().cloned().collect())
    }

    async fn name_publish(&self, key: &str, cid: Cid, lifetime: Duration) -> StoreResult<String> {
        let name = format!("name:{key}");
        let expires_at = if lifetime.is_zero() { None } else { Some(Instant::now() + lifetime) };
        self.inner.lock().names.insert(name.clone(), NameRecord { cid, expires_at });
        Ok(name)
    }

    async fn name_resolve(&self, name: &str) -> StoreResult<Cid> {
        let guard = self.inner.lock();
        let record = guard.names.get(name).ok_or_else(|| StoreError::NameNotFound(name.to_string()))?;
        if let Some(expires_at) = record.expires_at {
            if Instant::now() > expires_at {
                return Err(StoreError::NameNotFound(name.to_string()));
            }
        }
        Ok(record.cid.clone())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
