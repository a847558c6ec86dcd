//! Hosted storage backend speaking the storage REST dialect (`/storage/v1/object/...`).

use crate::keys::validate_object_path;
use crate::traits::{
    ListOptions, ObjectEntry, ObjectStorage, SortBy, StorageError, StorageResult, StoredObject,
    UploadOptions,
};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const STORAGE_PREFIX: &str = "/storage/v1";

#[derive(Debug, Deserialize, Default)]
struct ServiceErrorBody {
    #[serde(rename = "statusCode")]
    status_code: Option<Value>,
    error: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListRequest<'a> {
    prefix: &'a str,
    limit: usize,
    offset: usize,
    #[serde(rename = "sortBy")]
    sort_by: SortBy,
}

#[derive(Debug, Deserialize)]
struct ListItem {
    name: String,
    id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    metadata: Option<Value>,
}

#[derive(Debug, Serialize)]
struct RemoveRequest<'a> {
    prefixes: &'a [String],
}

#[derive(Debug, Serialize)]
struct SignRequest {
    #[serde(rename = "expiresIn")]
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

/// Object storage backed by the hosted storage service.
#[derive(Clone, Debug)]
pub struct RestStorage {
    client: Client,
    base_url: String,
    api_key: String,
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn transport_error(e: reqwest::Error) -> StorageError {
    if e.is_decode() {
        StorageError::Service {
            status: e.status().map(|s| s.as_u16()).unwrap_or(0),
            message: format!("Failed to parse storage response: {}", e),
        }
    } else {
        StorageError::Network(e.to_string())
    }
}

/// Turn a non-success response into a classified error.
fn error_from_body(http_status: u16, body: &str) -> StorageError {
    let parsed: ServiceErrorBody = serde_json::from_str(body).unwrap_or_default();
    let status = parsed
        .status_code
        .as_ref()
        .and_then(|v| match v {
            Value::String(s) => s.parse::<u16>().ok(),
            Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            _ => None,
        })
        .unwrap_or(http_status);
    let error = parsed.error.unwrap_or_default();
    let message = match parsed.message {
        Some(message) => message,
        None if error.is_empty() => body.trim().to_string(),
        None => String::new(),
    };
    StorageError::from_service_response(status, &error, &message)
}

impl RestStorage {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> StorageResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn object_url(&self, segment: &str, bucket: &str, path: Option<&str>) -> String {
        let mut url = format!("{}{}/object", self.base_url, STORAGE_PREFIX);
        if !segment.is_empty() {
            url.push('/');
            url.push_str(segment);
        }
        url.push('/');
        url.push_str(&urlencoding::encode(bucket));
        if let Some(path) = path {
            url.push('/');
            url.push_str(&encode_path(path));
        }
        url
    }

    fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", self.api_key.as_str())
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn send(&self, request: RequestBuilder) -> StorageResult<Response> {
        let response = self
            .apply_auth(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(error_from_body(status.as_u16(), &error_text));
        }
        Ok(response)
    }
}

#[async_trait]
impl ObjectStorage for RestStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Bytes,
        content_type: &str,
        options: &UploadOptions,
    ) -> StorageResult<StoredObject> {
        validate_object_path(path)?;
        let size = data.len();
        let start = std::time::Instant::now();

        let request = self
            .client
            .post(self.object_url("", bucket, Some(path)))
            .header("content-type", content_type)
            .header("cache-control", format!("max-age={}", options.cache_control_secs))
            .header("x-upsert", options.upsert.to_string())
            .body(data);

        self.send(request).await.inspect_err(|e| {
            tracing::error!(
                bucket = %bucket,
                key = %path,
                size_bytes = size,
                error = %e,
                "Storage upload failed"
            );
        })?;

        tracing::info!(
            bucket = %bucket,
            key = %path,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Storage upload successful"
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
        let body = ListRequest {
            prefix: prefix.trim_end_matches('/'),
            limit: options.limit,
            offset: options.offset,
            sort_by: options.sort_by,
        };
        let request = self
            .client
            .post(self.object_url("list", bucket, None))
            .json(&body);

        let items: Vec<ListItem> = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(transport_error)?;

        // Entries without an id are folder placeholders.
        Ok(items
            .into_iter()
            .filter(|item| item.id.is_some())
            .map(|item| ObjectEntry {
                size: item
                    .metadata
                    .as_ref()
                    .and_then(|m| m.get("size"))
                    .and_then(Value::as_u64),
                name: item.name,
                created_at: item.created_at,
            })
            .collect())
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> StorageResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        for path in paths {
            validate_object_path(path)?;
        }

        let request = self
            .client
            .delete(self.object_url("", bucket, None))
            .json(&RemoveRequest { prefixes: paths });
        self.send(request).await?;

        tracing::info!(bucket = %bucket, count = paths.len(), "Storage remove successful");
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.object_url("public", bucket, Some(path))
    }

    async fn create_signed_url(
        &self,
        bucket: &str,
        path: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        validate_object_path(path)?;
        let request = self
            .client
            .post(self.object_url("sign", bucket, Some(path)))
            .json(&SignRequest {
                expires_in: expires_in.as_secs(),
            });

        let signed: SignResponse = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(transport_error)?;

        Ok(format!("{}{}{}", self.base_url, STORAGE_PREFIX, signed.signed_url))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FailureKind;

    fn storage() -> RestStorage {
        RestStorage::new("https://project.example.org/", "anon-key", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_object_urls() {
        let storage = storage();
        assert_eq!(
            storage.object_url("", "course-images", Some("courses/1/a b.png")),
            "https://project.example.org/storage/v1/object/course-images/courses/1/a%20b.png"
        );
        assert_eq!(
            storage.object_url("list", "avatars", None),
            "https://project.example.org/storage/v1/object/list/avatars"
        );
        assert_eq!(
            storage.public_url("avatars", "users/9/me.png"),
            "https://project.example.org/storage/v1/object/public/avatars/users/9/me.png"
        );
    }

    #[test]
    fn test_error_payload_status_code_wins() {
        let err = error_from_body(
            400,
            r#"{"statusCode":"413","error":"Payload too large","message":"The object exceeded the maximum allowed size"}"#,
        );
        assert_eq!(err.failure_kind(), FailureKind::StorageQuota);

        let err = error_from_body(
            400,
            r#"{"statusCode":"403","error":"Unauthorized","message":"new row violates row-level security policy"}"#,
        );
        assert_eq!(err.failure_kind(), FailureKind::Permission);

        let err = error_from_body(409, r#"{"statusCode":409,"error":"Duplicate","message":"The resource already exists"}"#);
        assert!(matches!(err, StorageError::AlreadyExists(_)));
    }

    #[test]
    fn test_error_plain_text_body() {
        match error_from_body(502, "Bad Gateway") {
            StorageError::Service { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_list_request_shape() {
        let options = ListOptions::default();
        let body = serde_json::to_value(ListRequest {
            prefix: "users/1",
            limit: options.limit,
            offset: options.offset,
            sort_by: options.sort_by,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "prefix": "users/1",
                "limit": 100,
                "offset": 0,
                "sortBy": {"column": "created_at", "order": "desc"}
            })
        );
    }

    #[test]
    fn test_list_item_parsing() {
        let items: Vec<ListItem> = serde_json::from_str(
            r#"[
                {"name":"nested","id":null,"created_at":null,"metadata":null},
                {"name":"me.png","id":"a1","created_at":"2024-03-01T10:00:00Z","metadata":{"size":2048,"mimetype":"image/png"}}
            ]"#,
        )
        .unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0].id.is_none());
        assert_eq!(
            items[1].metadata.as_ref().and_then(|m| m.get("size")).and_then(Value::as_u64),
            Some(2048)
        );
    }
}
