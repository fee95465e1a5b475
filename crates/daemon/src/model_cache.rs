// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded local model cache, fetched on miss from the object store.
//!
//! Mirrors the daemon's admission contract: a single mutex over the entry
//! table plus a keyed single-flight map so concurrent `get`s for the same
//! `model_id` collapse into one fetch.

use async_trait::async_trait;
use dim_core::Clock;
use parking_lot::Mutex as SyncMutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;

/// Fetches the content blob for a model id — backed by an `ObjectStore` in
/// production, a stub in tests.
#[async_trait]
pub trait ModelFetcher: Send + Sync {
    async fn fetch(&self, model_id: &str) -> Result<Vec<u8>, ModelCacheError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ModelCacheError {
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("cache full after eviction pass")]
    CacheFull,
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ModelCacheEntry {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub last_used_ms: u64,
}

struct Inner {
    entries: HashMap<String, ModelCacheEntry>,
    total_size: u64,
}

/// Eviction target: after a pass, total size must be at or below 90% of
/// `max_cache_bytes`, not merely under it — leaves headroom for the next fetch.
const EVICTION_TARGET_RATIO: f64 = 0.9;

pub struct ModelCache<F: ModelFetcher, C: Clock> {
    cache_dir: PathBuf,
    max_cache_bytes: u64,
    fetcher: F,
    clock: C,
    inner: SyncMutex<Inner>,
    in_flight: SyncMutex<HashMap<String, Arc<Notify>>>,
}

impl<F: ModelFetcher, C: Clock> ModelCache<F, C> {
    pub fn new(cache_dir: impl Into<PathBuf>, max_cache_bytes: u64, fetcher: F, clock: C) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            max_cache_bytes,
            fetcher,
            clock,
            inner: SyncMutex::new(Inner { entries: HashMap::new(), total_size: 0 }),
            in_flight: SyncMutex::new(HashMap::new()),
        }
    }

    pub fn total_size(&self) -> u64 {
        self.inner.lock().total_size
    }

    pub fn contains(&self, model_id: &str) -> bool {
        self.inner.lock().entries.contains_key(model_id)
    }

    pub fn model_ids(&self) -> Vec<String> {
        self.inner.lock().entries.keys().cloned().collect()
    }

    fn model_dir(&self, model_id: &str) -> PathBuf {
        self.cache_dir.join(model_id)
    }

    /// Resolve `model_id` to a local path, fetching on miss. Concurrent
    /// callers for the same `model_id` share one in-flight fetch.
    pub async fn get(&self, model_id: &str) -> Result<PathBuf, ModelCacheError> {
        loop {
            if let Some(path) = self.try_hit(model_id).await {
                return Ok(path);
            }

            let wait = {
                let mut in_flight = self.in_flight.lock();
                if let Some(notify) = in_flight.get(model_id) {
                    Some(notify.clone())
                } else {
                    in_flight.insert(model_id.to_string(), Arc::new(Notify::new()));
                    None
                }
            };

            if let Some(notify) = wait {
                notify.notified().await;
                continue;
            }

            let result = self.fetch_and_insert(model_id).await;
            let notify = self.in_flight.lock().remove(model_id);
            if let Some(notify) = notify {
                notify.notify_waiters();
            }
            return result;
        }
    }

    /// Check for an existing, still-present entry and refresh `last_used`.
    /// Repairs (evicts the entry) if the backing file vanished externally.
    async fn try_hit(&self, model_id: &str) -> Option<PathBuf> {
        let path = {
            let inner = self.inner.lock();
            inner.entries.get(model_id).map(|e| e.path.clone())
        };
        let path = path?;
        if tokio::fs::metadata(&path).await.is_ok() {
            let mut inner = self.inner.lock();
            if let Some(entry) = inner.entries.get_mut(model_id) {
                entry.last_used_ms = self.clock.epoch_ms();
            }
            Some(path)
        } else {
            let mut inner = self.inner.lock();
            if let Some(entry) = inner.entries.remove(model_id) {
                inner.total_size = inner.total_size.saturating_sub(entry.size_bytes);
            }
            None
        }
    }

    async fn fetch_and_insert(&self, model_id: &str) -> Result<PathBuf, ModelCacheError> {
        let bytes = self.fetcher.fetch(model_id).await?;
        let dir = self.model_dir(model_id);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join("blob");
        tokio::fs::write(&path, &bytes).await?;

        let size_bytes = bytes.len() as u64;
        {
            let mut inner = self.inner.lock();
            inner.total_size += size_bytes;
            inner.entries.insert(
                model_id.to_string(),
                ModelCacheEntry { path: path.clone(), size_bytes, last_used_ms: self.clock.epoch_ms() },
            );
        }

        self.evict_if_needed().await?;
        Ok(path)
    }

    /// Evict by ascending `last_used` until total size is at or below the
    /// eviction target. A best-effort extra pass runs if the first leaves the
    /// cache still over the hard cap, after which `CacheFull` is reported.
    async fn evict_if_needed(&self) -> Result<(), ModelCacheError> {
        if self.inner.lock().total_size <= self.max_cache_bytes {
            return Ok(());
        }
        self.run_eviction_pass().await;
        if self.inner.lock().total_size > self.max_cache_bytes {
            self.run_eviction_pass().await;
        }
        if self.inner.lock().total_size > self.max_cache_bytes {
            return Err(ModelCacheError::CacheFull);
        }
        Ok(())
    }

    async fn run_eviction_pass(&self) {
        let target = (self.max_cache_bytes as f64 * EVICTION_TARGET_RATIO) as u64;
        let victims: Vec<(String, PathBuf)> = {
            let mut inner = self.inner.lock();
            let mut ordered: Vec<(String, ModelCacheEntry)> =
                inner.entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            ordered.sort_by_key(|(_, e)| e.last_used_ms);

            let mut victims = Vec::new();
            for (id, entry) in ordered {
                if inner.total_size <= target {
                    break;
                }
                inner.entries.remove(&id);
                inner.total_size = inner.total_size.saturating_sub(entry.size_bytes);
                victims.push((id, entry.path));
            }
            victims
        };

        for (_, path) in victims {
            if let Some(dir) = path.parent() {
                let _ = tokio::fs::remove_dir_all(dir).await;
            }
        }
    }
}

/// Resolves `model_id` to a content id via the object store's mutable-name
/// layer, then fetches the blob. This is the production [`ModelFetcher`];
/// tests substitute a stub that skips the object store entirely.
pub struct ObjectStoreModelFetcher {
    store: Arc<dyn dim_objectstore::ObjectStore>,
}

impl ObjectStoreModelFetcher {
    pub fn new(store: Arc<dyn dim_objectstore::ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ModelFetcher for ObjectStoreModelFetcher {
    async fn fetch(&self, model_id: &str) -> Result<Vec<u8>, ModelCacheError> {
        let cid = self
            .store
            .name_resolve(model_id)
            .await
            .map_err(|e| ModelCacheError::ModelUnavailable(format!("{model_id}: {e}")))?;
        self.store.get(&cid).await.map_err(|e| ModelCacheError::ModelUnavailable(format!("{model_id}: {e}")))
    }
}

#[cfg(test)]
#[path = "model_cache_tests.rs"]
mod tests;
