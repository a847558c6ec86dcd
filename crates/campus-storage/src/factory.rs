#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-rest")]
use crate::RestStorage;
use crate::{MemoryStorage, ObjectStorage, StorageBackend, StorageError, StorageResult};
use campus_core::Config;
use std::sync::Arc;

/// Create a storage backend based on configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn ObjectStorage>> {
    let backend = config.storage_backend();
    tracing::debug!(backend = %backend, "Creating storage backend");

    match backend {
        #[cfg(feature = "storage-rest")]
        StorageBackend::Rest => {
            let url = config.storage_api_url().ok_or_else(|| {
                StorageError::ConfigError("STORAGE_API_URL not configured".to_string())
            })?;
            let key = config.storage_api_key().ok_or_else(|| {
                StorageError::ConfigError("STORAGE_API_KEY not configured".to_string())
            })?;

            let storage = RestStorage::new(url, key, config.http_timeout())?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-rest"))]
        StorageBackend::Rest => Err(StorageError::ConfigError(
            "REST storage backend not available (storage-rest feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = config
                .local_storage_path()
                .map(String::from)
                .ok_or_else(|| {
                    StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
                })?;
            let base_url = config
                .local_storage_base_url()
                .map(String::from)
                .ok_or_else(|| {
                    StorageError::ConfigError("LOCAL_STORAGE_BASE_URL not configured".to_string())
                })?;

            let storage = LocalStorage::new(base_path, base_url).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),

        StorageBackend::Memory => Ok(Arc::new(MemoryStorage::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_core::CampusConfig;

    #[tokio::test]
    async fn test_create_memory_storage() {
        let storage = create_storage(&Config::in_memory()).await.unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::Memory);
    }

    #[cfg(feature = "storage-local")]
    #[tokio::test]
    async fn test_create_local_storage() {
        let dir = tempfile::tempdir().unwrap();
        let mut inner = CampusConfig::in_memory();
        inner.storage_backend = StorageBackend::Local;
        inner.local_storage_path = Some(dir.path().display().to_string());
        inner.local_storage_base_url = Some("http://localhost:8080/files".to_string());

        let storage = create_storage(&Config(Box::new(inner))).await.unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::Local);
    }

    #[tokio::test]
    async fn test_rest_storage_requires_url() {
        let mut inner = CampusConfig::in_memory();
        inner.storage_backend = StorageBackend::Rest;
        let result = create_storage(&Config(Box::new(inner))).await;
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }
}
