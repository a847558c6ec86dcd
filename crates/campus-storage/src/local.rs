use crate::keys::validate_object_path;
use crate::traits::{
    apply_list_options, ListOptions, ObjectEntry, ObjectStorage, StorageError, StorageResult,
    StoredObject, UploadOptions,
};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
///
/// Each bucket is a directory under `base_path`; objects are files below it.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for bucket directories (e.g., "/var/lib/campus/storage")
    /// * `base_url` - Base URL the directory is served from (e.g., "http://localhost:8080/files")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    /// Convert bucket and object path to a filesystem path with security validation
    ///
    /// Rejects anything that is not a plain relative path, so the result always stays
    /// under the base storage directory.
    fn object_to_path(&self, bucket: &str, path: &str) -> StorageResult<PathBuf> {
        if bucket.is_empty() || bucket.contains('/') {
            return Err(StorageError::InvalidKey(format!("Invalid bucket name: {}", bucket)));
        }
        validate_object_path(bucket)?;
        validate_object_path(path)?;

        let relative = Path::new(bucket).join(path);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::InvalidKey(
                "Object path resolves outside storage directory".to_string(),
            ));
        }

        Ok(self.base_path.join(relative))
    }

    fn bucket_dir(&self, bucket: &str, prefix: &str) -> StorageResult<PathBuf> {
        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            validate_object_path(bucket)?;
            return Ok(self.base_path.join(bucket));
        }
        self.object_to_path(bucket, prefix)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Bytes,
        _content_type: &str,
        options: &UploadOptions,
    ) -> StorageResult<StoredObject> {
        let file_path = self.object_to_path(bucket, path)?;
        let size = data.len();

        self.ensure_parent_dir(&file_path).await?;

        let start = std::time::Instant::now();

        let mut open = fs::OpenOptions::new();
        open.write(true);
        if options.upsert {
            open.create(true).truncate(true);
        } else {
            open.create_new(true);
        }

        let mut file = open.open(&file_path).await.map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => StorageError::AlreadyExists(format!("{}/{}", bucket, path)),
            ErrorKind::PermissionDenied => StorageError::PermissionDenied(format!(
                "Failed to create file {}: {}",
                file_path.display(),
                e
            )),
            _ => StorageError::IoError(e),
        })?;

        file.write_all(&data).await?;
        file.sync_all().await?;

        tracing::info!(
            path = %file_path.display(),
            bucket = %bucket,
            key = %path,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

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
        let dir = self.bucket_dir(bucket, prefix)?;

        let mut read_dir = match fs::read_dir(&dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let created_at = metadata
                .created()
                .or_else(|_| metadata.modified())
                .ok()
                .map(DateTime::<Utc>::from);
            entries.push(ObjectEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                size: Some(metadata.len()),
                created_at,
            });
        }

        Ok(apply_list_options(entries, options))
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> StorageResult<()> {
        let start = std::time::Instant::now();

        for path in paths {
            let file_path = self.object_to_path(bucket, path)?;
            match fs::remove_file(&file_path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(
            bucket = %bucket,
            count = paths.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage remove successful"
        );

        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{}/{}", self.base_url.trim_end_matches('/'), bucket, path)
    }

    async fn create_signed_url(
        &self,
        bucket: &str,
        path: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let file_path = self.object_to_path(bucket, path)?;
        if !fs::try_exists(&file_path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(format!("{}/{}", bucket, path)));
        }
        let expires = Utc::now().timestamp() + expires_in.as_secs() as i64;
        Ok(format!("{}?expires={}", self.public_url(bucket, path), expires))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
