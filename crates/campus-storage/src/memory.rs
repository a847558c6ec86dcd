//! In-memory storage backend.
//!
//! Used by tests and dry runs. Supports fault injection so callers can exercise their
//! failure paths without a network.

use crate::keys::validate_object_path;
use crate::traits::{
    apply_list_options, ListOptions, ObjectEntry, ObjectStorage, StorageError, StorageResult,
    StoredObject, UploadOptions,
};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Clone)]
pub struct MemoryObject {
    pub data: Bytes,
    pub content_type: String,
    pub cache_control_secs: u64,
    pub created_at: DateTime<Utc>,
}

type ObjectMap = HashMap<(String, String), MemoryObject>;

/// In-memory object store
#[derive(Default)]
pub struct MemoryStorage {
    objects: RwLock<ObjectMap>,
    upload_faults: Mutex<VecDeque<StorageError>>,
    fail_removes: AtomicBool,
    quota_bytes: Option<u64>,
    upload_calls: AtomicUsize,
    remove_calls: AtomicUsize,
    base_url: Option<String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject uploads once the stored total would exceed `quota_bytes`.
    pub fn with_quota(mut self, quota_bytes: u64) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Make the next upload fail with `error`. Faults queue up in call order.
    pub async fn fail_next_upload(&self, error: StorageError) {
        self.upload_faults.lock().await.push_back(error);
    }

    /// Make every `remove` call fail until switched off again.
    pub fn fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }

    /// Number of upload calls that reached the backend, including failed ones.
    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn remove_calls(&self) -> usize {
        self.remove_calls.load(Ordering::SeqCst)
    }

    pub async fn get(&self, bucket: &str, path: &str) -> Option<MemoryObject> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
    }

    pub async fn contains(&self, bucket: &str, path: &str) -> bool {
        self.get(bucket, path).await.is_some()
    }

    /// Number of objects stored in `bucket`.
    pub async fn object_count(&self, bucket: &str) -> usize {
        self.objects
            .read()
            .await
            .keys()
            .filter(|(b, _)| b == bucket)
            .count()
    }

    /// Insert an object directly, bypassing faults and counters.
    pub async fn seed(&self, bucket: &str, path: &str, data: impl Into<Bytes>, content_type: &str) {
        self.objects.write().await.insert(
            (bucket.to_string(), path.to_string()),
            MemoryObject {
                data: data.into(),
                content_type: content_type.to_string(),
                cache_control_secs: 0,
                created_at: Utc::now(),
            },
        );
    }

    fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or("memory://storage")
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Bytes,
        content_type: &str,
        options: &UploadOptions,
    ) -> StorageResult<StoredObject> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        validate_object_path(path)?;

        if let Some(fault) = self.upload_faults.lock().await.pop_front() {
            tracing::debug!(bucket = %bucket, path = %path, error = %fault, "Injected upload failure");
            return Err(fault);
        }

        let mut objects = self.objects.write().await;
        let key = (bucket.to_string(), path.to_string());

        if !options.upsert && objects.contains_key(&key) {
            return Err(StorageError::AlreadyExists(format!("{}/{}", bucket, path)));
        }

        if let Some(quota) = self.quota_bytes {
            let used: u64 = objects
                .iter()
                .filter(|(k, _)| **k != key)
                .map(|(_, o)| o.data.len() as u64)
                .sum();
            if used + data.len() as u64 > quota {
                return Err(StorageError::QuotaExceeded(format!(
                    "{} bytes used of {} allowed",
                    used, quota
                )));
            }
        }

        let size = data.len();
        objects.insert(
            key,
            MemoryObject {
                data,
                content_type: content_type.to_string(),
                cache_control_secs: options.cache_control_secs,
                created_at: Utc::now(),
            },
        );

        tracing::debug!(bucket = %bucket, path = %path, size_bytes = size, "Memory storage upload");

        Ok(StoredObject {
            bucket: bucket.to_string(),
            path: path.to_string(),
        })
    }

    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        options: &ListOptions,
    ) -> StorageResult<Vec<ObjectEntry>> {
        let prefix = prefix.trim_end_matches('/');
        let objects = self.objects.read().await;

        let entries = objects
            .iter()
            .filter(|((b, _), _)| b == bucket)
            .filter_map(|((_, path), object)| {
                let name = if prefix.is_empty() {
                    path.as_str()
                } else {
                    path.strip_prefix(prefix)?.strip_prefix('/')?
                };
                if name.is_empty() || name.contains('/') {
                    return None;
                }
                Some(ObjectEntry {
                    name: name.to_string(),
                    size: Some(object.data.len() as u64),
                    created_at: Some(object.created_at),
                })
            })
            .collect();

        Ok(apply_list_options(entries, options))
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> StorageResult<()> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(StorageError::Network("remove failed (injected)".to_string()));
        }

        let mut objects = self.objects.write().await;
        for path in paths {
            validate_object_path(path)?;
            objects.remove(&(bucket.to_string(), path.clone()));
        }
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{}/{}", self.base_url().trim_end_matches('/'), bucket, path)
    }

    async fn create_signed_url(
        &self,
        bucket: &str,
        path: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        validate_object_path(path)?;
        if !self.contains(bucket, path).await {
            return Err(StorageError::NotFound(format!("{}/{}", bucket, path)));
        }
        let expires = Utc::now().timestamp() + expires_in.as_secs() as i64;
        Ok(format!("{}?expires={}", self.public_url(bucket, path), expires))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
