//! Named cache storage.
//!
//! Mirrors the hosting runtime's cache API: a storage of named caches, each mapping a
//! request identity to a stored response. Concurrent writers to one key race; the last
//! write wins.

use crate::error::{GatewayError, GatewayResult};
use crate::request::{CacheKey, CachedResponse};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// One named cache.
#[async_trait]
pub trait Cache: Send + Sync {
    fn name(&self) -> &str;

    async fn put(&self, key: CacheKey, response: CachedResponse) -> GatewayResult<()>;

    async fn get(&self, key: &CacheKey) -> GatewayResult<Option<CachedResponse>>;

    async fn entries(&self) -> GatewayResult<Vec<CacheKey>>;
}

/// The set of named caches.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a cache, creating it if needed.
    async fn open(&self, name: &str) -> GatewayResult<Arc<dyn Cache>>;

    /// Cache names in creation order.
    async fn keys(&self) -> GatewayResult<Vec<String>>;

    /// Delete a cache. Returns false if it did not exist.
    async fn delete(&self, name: &str) -> GatewayResult<bool>;

    /// First match for `key` across all caches, in creation order.
    async fn match_any(&self, key: &CacheKey) -> GatewayResult<Option<CachedResponse>>;
}

fn unavailable() -> GatewayError {
    GatewayError::CacheUnavailable("cache storage is not accessible".to_string())
}

pub struct MemoryCache {
    name: String,
    entries: RwLock<HashMap<CacheKey, CachedResponse>>,
    available: Arc<AtomicBool>,
    read_only: Arc<AtomicBool>,
}

impl MemoryCache {
    fn check(&self) -> GatewayResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(unavailable())
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, key: CacheKey, response: CachedResponse) -> GatewayResult<()> {
        self.check()?;
        if self.read_only.load(Ordering::SeqCst) {
            return Err(GatewayError::CacheUnavailable(format!(
                "cache {} rejected the write",
                self.name
            )));
        }
        self.entries.write().await.insert(key, response);
        Ok(())
    }

    async fn get(&self, key: &CacheKey) -> GatewayResult<Option<CachedResponse>> {
        self.check()?;
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn entries(&self) -> GatewayResult<Vec<CacheKey>> {
        self.check()?;
        let mut keys: Vec<CacheKey> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

/// In-process cache storage with a switch to simulate an inaccessible storage.
pub struct MemoryCacheStorage {
    caches: RwLock<Vec<Arc<MemoryCache>>>,
    available: Arc<AtomicBool>,
    read_only: Arc<AtomicBool>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self {
            caches: RwLock::new(Vec::new()),
            available: Arc::new(AtomicBool::new(true)),
            read_only: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make every operation fail with `CacheUnavailable` (or recover).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.available.store(!unavailable, Ordering::SeqCst);
    }

    /// Make every `put` fail while reads keep working (quota exhausted).
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    fn check(&self) -> GatewayResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(unavailable())
        }
    }
}

impl Default for MemoryCacheStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> GatewayResult<Arc<dyn Cache>> {
        self.check()?;
        let mut caches = self.caches.write().await;
        if let Some(existing) = caches.iter().find(|c| c.name == name) {
            return Ok(existing.clone());
        }
        let cache = Arc::new(MemoryCache {
            name: name.to_string(),
            entries: RwLock::new(HashMap::new()),
            available: Arc::clone(&self.available),
            read_only: Arc::clone(&self.read_only),
        });
        caches.push(cache.clone());
        tracing::debug!(cache = %name, "Cache created");
        Ok(cache)
    }

    async fn keys(&self) -> GatewayResult<Vec<String>> {
        self.check()?;
        Ok(self
            .caches
            .read()
            .await
            .iter()
            .map(|c| c.name.clone())
            .collect())
    }

    async fn delete(&self, name: &str) -> GatewayResult<bool> {
        self.check()?;
        let mut caches = self.caches.write().await;
        let before = caches.len();
        caches.retain(|c| c.name != name);
        Ok(caches.len() != before)
    }

    async fn match_any(&self, key: &CacheKey) -> GatewayResult<Option<CachedResponse>> {
        self.check()?;
        let caches: Vec<Arc<MemoryCache>> = self.caches.read().await.clone();
        for cache in caches {
            if let Some(found) = cache.get(key).await? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::{Method, Url};

    fn key(path: &str) -> CacheKey {
        CacheKey::new(
            Method::GET,
            &Url::parse("https://x.org").unwrap().join(path).unwrap(),
        )
    }

    #[tokio::test]
    async fn open_is_idempotent_and_ordered() {
        let storage = MemoryCacheStorage::new();
        let a = storage.open("a").await.unwrap();
        storage.open("b").await.unwrap();
        let a_again = storage.open("a").await.unwrap();

        a.put(key("/x"), CachedResponse::ok("1")).await.unwrap();
        assert!(a_again.get(&key("/x")).await.unwrap().is_some());
        assert_eq!(storage.keys().await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn match_any_searches_in_creation_order() {
        let storage = MemoryCacheStorage::new();
        let first = storage.open("first").await.unwrap();
        let second = storage.open("second").await.unwrap();
        second.put(key("/x"), CachedResponse::ok("second")).await.unwrap();
        assert_eq!(
            storage.match_any(&key("/x")).await.unwrap().unwrap().body,
            "second"
        );
        first.put(key("/x"), CachedResponse::ok("first")).await.unwrap();
        assert_eq!(
            storage.match_any(&key("/x")).await.unwrap().unwrap().body,
            "first"
        );
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let storage = MemoryCacheStorage::new();
        storage.open("old").await.unwrap();
        assert!(storage.delete("old").await.unwrap());
        assert!(!storage.delete("old").await.unwrap());
    }

    #[tokio::test]
    async fn unavailable_storage_fails_every_operation() {
        let storage = MemoryCacheStorage::new();
        let cache = storage.open("a").await.unwrap();
        storage.set_unavailable(true);
        assert!(matches!(
            storage.open("a").await,
            Err(GatewayError::CacheUnavailable(_))
        ));
        assert!(cache.get(&key("/x")).await.is_err());
        storage.set_unavailable(false);
        assert!(storage.keys().await.is_ok());
    }

    #[tokio::test]
    async fn read_only_storage_rejects_writes_only() {
        let storage = MemoryCacheStorage::new();
        let cache = storage.open("a").await.unwrap();
        cache.put(key("/x"), CachedResponse::ok("x")).await.unwrap();
        storage.set_read_only(true);
        assert!(cache.put(key("/y"), CachedResponse::ok("y")).await.is_err());
        assert!(cache.get(&key("/x")).await.unwrap().is_some());
    }
}
