// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The object store contract: content-addressed blobs, pinning, mutable
//! names, and topic pub/sub. Any backend — in-memory, IPFS, a gateway over
//! S3 — satisfies this trait; the rest of the mesh only ever depends on it.

use crate::cid::Cid;
use crate::error::StoreResult;
use async_trait::async_trait;
use std::time::Duration;

/// A live subscription to a topic. Each `recv` yields the next published
/// payload; a lagging subscriber has old messages dropped rather than
/// buffered without bound.
pub struct Subscription {
    inner: tokio::sync::broadcast::Receiver<Vec<u8>>,
}

impl Subscription {
    pub fn new(inner: tokio::sync::broadcast::Receiver<Vec<u8>>) -> Self {
        Self { inner }
    }

    /// Await the next message. Returns `None` once the topic's publisher
    /// side has been dropped entirely (no backend implementation does this
    /// for long-lived topics, but tests may).
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        loop {
            match self.inner.recv().await {
                Ok(payload) => return Some(payload),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "subscriber lagged, messages dropped");
                    continue;
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Content-addressed object store with pub/sub and mutable-name resolution.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store bytes, returning their content id. Unpinned objects are subject
    /// to backend-defined garbage collection.
    async fn put(&self, bytes: Vec<u8>) -> StoreResult<Cid>;

    /// Store bytes and pin them atomically.
    async fn put_pinned(&self, bytes: Vec<u8>) -> StoreResult<Cid>;

    async fn get(&self, cid: &Cid) -> StoreResult<Vec<u8>>;

    async fn pin(&self, cid: &Cid) -> StoreResult<()>;

    async fn unpin(&self, cid: &Cid) -> StoreResult<()>;

    /// Publish a JSON-encoded payload to a topic. Never fails on the absence
    /// of subscribers.
    async fn publish(&self, topic: &str, bytes: Vec<u8>) -> StoreResult<()>;

    async fn subscribe(&self, topic: &str) -> StoreResult<Subscription>;

    /// Opaque peer identifiers currently subscribed to `topic`. Best-effort;
    /// an in-memory backend reports only local subscriber counts.
    async fn peers(&self, topic: &str) -> StoreResult<Vec<String>>;

    async fn topics(&self) -> StoreResult<Vec<String>>;

    /// Publish a mutable pointer: `key` now resolves to `cid` until
    /// `lifetime` elapses (a hint; backends may refresh or ignore it).
    async fn name_publish(&self, key: &str, cid: Cid, lifetime: Duration) -> StoreResult<String>;

    async fn name_resolve(&self, name: &str) -> StoreResult<Cid>;
}
