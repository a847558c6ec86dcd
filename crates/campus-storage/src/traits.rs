//! Object storage abstraction trait
//!
//! This module defines the `ObjectStorage` trait that all storage backends must implement,
//! along with the option types shared by every backend.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use campus_core::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid object path: {0}")]
    InvalidKey(String),

    #[error("Storage service returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Coarse failure classification reported to the user after a failed upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    Network,
    StorageQuota,
    Permission,
    Unknown,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Network => "network",
            FailureKind::StorageQuota => "storage-quota",
            FailureKind::Permission => "permission",
            FailureKind::Unknown => "unknown",
        }
    }

    /// Message shown next to the failed upload.
    pub fn user_message(&self) -> &'static str {
        match self {
            FailureKind::Network => "Network error. Check your connection and try again.",
            FailureKind::StorageQuota => "Storage quota exceeded.",
            FailureKind::Permission => "You do not have permission to upload this file.",
            FailureKind::Unknown => "The file could not be uploaded.",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StorageError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            StorageError::Network(_) => FailureKind::Network,
            StorageError::QuotaExceeded(_) => FailureKind::StorageQuota,
            StorageError::PermissionDenied(_) => FailureKind::Permission,
            _ => FailureKind::Unknown,
        }
    }

    /// Map a non-success response from a storage service to an error variant.
    ///
    /// `error` and `message` come from the `{statusCode, error, message}` payload; either may
    /// be empty when the body was not JSON.
    pub fn from_service_response(status: u16, error: &str, message: &str) -> Self {
        let text = format!("{} {}", error, message).to_lowercase();
        let detail = if message.is_empty() {
            error.to_string()
        } else {
            message.to_string()
        };

        if status == 413 || text.contains("quota") || text.contains("exceeded") {
            StorageError::QuotaExceeded(detail)
        } else if status == 401
            || status == 403
            || text.contains("unauthorized")
            || text.contains("policy")
        {
            StorageError::PermissionDenied(detail)
        } else if status == 404 {
            StorageError::NotFound(detail)
        } else if status == 409 || text.contains("duplicate") {
            StorageError::AlreadyExists(detail)
        } else {
            StorageError::Service {
                status,
                message: detail,
            }
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Network(msg) => AppError::Network(msg),
            StorageError::QuotaExceeded(msg) => AppError::QuotaExceeded(msg),
            StorageError::PermissionDenied(msg) => AppError::PermissionDenied(msg),
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::ConfigError(msg) => AppError::Config(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Options applied to a single upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    /// `max-age` in seconds for the stored object's cache-control header
    pub cache_control_secs: u64,
    /// Overwrite an existing object at the same path
    pub upsert: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            cache_control_secs: campus_core::constants::DEFAULT_UPLOAD_CACHE_CONTROL_SECS,
            upsert: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    Name,
    CreatedAt,
    UpdatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortBy {
    pub column: SortColumn,
    pub order: SortOrder,
}

/// Listing window and ordering. Defaults to the 100 newest objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    pub limit: usize,
    pub offset: usize,
    pub sort_by: SortBy,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
            sort_by: SortBy {
                column: SortColumn::CreatedAt,
                order: SortOrder::Desc,
            },
        }
    }
}

/// An object directly under a listed prefix. `name` is relative to that prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub name: String,
    pub size: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Location of an object that was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub bucket: String,
    pub path: String,
}

/// Sort entries in place and apply the offset/limit window.
pub(crate) fn apply_list_options(mut entries: Vec<ObjectEntry>, options: &ListOptions) -> Vec<ObjectEntry> {
    entries.sort_by(|a, b| {
        let ordering = match options.sort_by.column {
            SortColumn::Name => a.name.cmp(&b.name),
            SortColumn::CreatedAt | SortColumn::UpdatedAt => {
                a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name))
            }
        };
        match options.sort_by.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
    entries
        .into_iter()
        .skip(options.offset)
        .take(options.limit)
        .collect()
}

/// Object storage abstraction trait
///
/// Backends store objects in named buckets. The upload pipeline only talks to this trait,
/// so the hosted REST service, the local filesystem and the in-memory store are
/// interchangeable.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Write `data` at `bucket/path`.
    ///
    /// Fails with `AlreadyExists` when an object is present and `options.upsert` is false.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Bytes,
        content_type: &str,
        options: &UploadOptions,
    ) -> StorageResult<StoredObject>;

    /// List the objects directly under `prefix` (no recursion).
    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        options: &ListOptions,
    ) -> StorageResult<Vec<ObjectEntry>>;

    /// Remove objects. Paths that do not exist are ignored.
    async fn remove(&self, bucket: &str, paths: &[String]) -> StorageResult<()>;

    /// Public URL of an object in a public bucket. Does not check existence.
    fn public_url(&self, bucket: &str, path: &str) -> String;

    /// Time-limited URL for an object in a private bucket.
    async fn create_signed_url(
        &self,
        bucket: &str,
        path: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_are_classified() {
        assert_eq!(
            StorageError::from_service_response(413, "Payload too large", "").failure_kind(),
            FailureKind::StorageQuota
        );
        assert_eq!(
            StorageError::from_service_response(400, "", "The object exceeded the quota")
                .failure_kind(),
            FailureKind::StorageQuota
        );
        assert_eq!(
            StorageError::from_service_response(403, "Unauthorized", "").failure_kind(),
            FailureKind::Permission
        );
        assert_eq!(
            StorageError::from_service_response(400, "", "new row violates row-level security policy")
                .failure_kind(),
            FailureKind::Permission
        );
        assert!(matches!(
            StorageError::from_service_response(404, "not_found", "Object not found"),
            StorageError::NotFound(_)
        ));
        assert!(matches!(
            StorageError::from_service_response(409, "Duplicate", "The resource already exists"),
            StorageError::AlreadyExists(_)
        ));
        assert!(matches!(
            StorageError::from_service_response(500, "", "boom"),
            StorageError::Service { status: 500, .. }
        ));
    }

    #[test]
    fn failure_kind_strings() {
        assert_eq!(StorageError::Network("offline".into()).failure_kind().as_str(), "network");
        assert_eq!(FailureKind::StorageQuota.to_string(), "storage-quota");
        assert_eq!(
            StorageError::NotFound("x".into()).failure_kind(),
            FailureKind::Unknown
        );
    }

    #[test]
    fn list_options_sort_and_window() {
        let entry = |name: &str, secs: i64| ObjectEntry {
            name: name.to_string(),
            size: Some(1),
            created_at: DateTime::from_timestamp(secs, 0),
        };
        let entries = vec![entry("a", 10), entry("b", 30), entry("c", 20)];

        let newest = apply_list_options(entries.clone(), &ListOptions::default());
        let names: Vec<_> = newest.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "a"]);

        let options = ListOptions {
            limit: 1,
            offset: 1,
            sort_by: SortBy {
                column: SortColumn::Name,
                order: SortOrder::Asc,
            },
        };
        let page = apply_list_options(entries, &options);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "b");
    }
}
