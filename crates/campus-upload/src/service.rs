//! Upload service: validation, object naming, storage and URL resolution.

use crate::error::UploadError;
use crate::progress::ProgressReporter;
use crate::session::{UploadFailure, UploadOutcome, UploadSession, UploadState};
use crate::validator::{validate, Verdict};
use bytes::Bytes;
use campus_core::{Config, FileHandle, PathParams, UploadTarget, Visibility};
use campus_storage::{
    generate_object_name, ListOptions, ObjectEntry, ObjectStorage, StorageError, UploadOptions,
};
use std::sync::Arc;
use std::time::Duration;

/// Settings applied to every upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSettings {
    pub cache_control_secs: u64,
    pub signed_url_expiry: Duration,
}

impl UploadSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cache_control_secs: config.upload_cache_control_secs(),
            signed_url_expiry: config.signed_url_expiry(),
        }
    }
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            cache_control_secs: campus_core::constants::DEFAULT_UPLOAD_CACHE_CONTROL_SECS,
            signed_url_expiry: Duration::from_secs(
                campus_core::constants::DEFAULT_SIGNED_URL_EXPIRY_SECS,
            ),
        }
    }
}

/// Drives upload sessions against an object storage backend.
#[derive(Clone)]
pub struct UploadService {
    storage: Arc<dyn ObjectStorage>,
    settings: UploadSettings,
}

impl UploadService {
    pub fn new(storage: Arc<dyn ObjectStorage>, settings: UploadSettings) -> Self {
        Self { storage, settings }
    }

    pub fn storage(&self) -> &Arc<dyn ObjectStorage> {
        &self.storage
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    /// Start a session for a selected file.
    ///
    /// The session comes back either `Rejected` (nothing generated, nothing sent) or
    /// `Uploading` with its storage key fixed. Fails only when the target's path template
    /// needs an identifier missing from `params`.
    pub fn select(
        &self,
        file: FileHandle,
        target: UploadTarget,
        params: PathParams,
    ) -> Result<UploadSession, UploadError> {
        let mut session = UploadSession::new(file, target, params);
        session.begin_validation()?;

        if let Verdict::Rejected(rejection) = validate(session.file(), session.target()) {
            tracing::debug!(
                session = %session.id(),
                file = %session.file().name,
                target = %session.target().kind,
                reason = %rejection,
                "Upload rejected by validation"
            );
            session.reject(rejection)?;
            return Ok(session);
        }

        let object_name = generate_object_name(&session.file().name);
        let storage_key = session.target().object_path(session.params(), &object_name)?;
        session.start_upload(object_name, storage_key)?;
        Ok(session)
    }

    /// Send an `Uploading` session to storage.
    ///
    /// Storage failures do not surface as `Err`; they leave the session `Failed` with a
    /// classified reason. The returned state is the session's new state.
    pub async fn upload(
        &self,
        session: &mut UploadSession,
        progress: &ProgressReporter,
    ) -> Result<UploadState, UploadError> {
        let storage_key = match session.state() {
            UploadState::Uploading { storage_key } => storage_key.clone(),
            other => {
                return Err(UploadError::InvalidTransition {
                    from: other.name(),
                    to: "uploading",
                })
            }
        };

        let bucket = session.target().bucket.clone();
        let running = progress.start();
        let start = std::time::Instant::now();

        if session.target().replace_existing {
            self.remove_previous(session, &storage_key).await;
        }

        match self.put_object(session, &bucket, &storage_key).await {
            Ok(url) => {
                tracing::info!(
                    session = %session.id(),
                    bucket = %bucket,
                    key = %storage_key,
                    size_bytes = session.file().declared_size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Upload completed"
                );
                running.complete();
                let object_name = session.object_name().unwrap_or_default().to_string();
                session.succeed(UploadOutcome {
                    bucket,
                    path: storage_key,
                    url,
                    object_name,
                })?;
            }
            Err(e) => {
                let kind = e.failure_kind();
                tracing::error!(
                    session = %session.id(),
                    bucket = %bucket,
                    key = %storage_key,
                    failure = %kind,
                    error = %e,
                    "Upload failed"
                );
                running.hide();
                session.fail(UploadFailure {
                    kind,
                    message: e.to_string(),
                })?;
            }
        }

        Ok(session.state().clone())
    }

    async fn put_object(
        &self,
        session: &UploadSession,
        bucket: &str,
        storage_key: &str,
    ) -> Result<String, StorageError> {
        let options = UploadOptions {
            cache_control_secs: self.settings.cache_control_secs,
            upsert: false,
        };
        let file = session.file();
        self.storage
            .upload(
                bucket,
                storage_key,
                Bytes::from(file.data.clone()),
                &file.mime_type,
                &options,
            )
            .await?;

        match session.target().visibility {
            Visibility::Public => Ok(self.storage.public_url(bucket, storage_key)),
            Visibility::Private => {
                let signed = self
                    .storage
                    .create_signed_url(bucket, storage_key, self.settings.signed_url_expiry)
                    .await;
                if signed.is_err() {
                    // A private object cannot be read without a signed URL, so remove it.
                    if let Err(e) = self
                        .storage
                        .remove(bucket, &[storage_key.to_string()])
                        .await
                    {
                        tracing::warn!(bucket = %bucket, key = %storage_key, error = %e, "Failed to remove unsigned upload");
                    }
                }
                signed
            }
        }
    }

    /// Best-effort removal of every object under the owner's prefix (single current avatar).
    async fn remove_previous(&self, session: &UploadSession, new_key: &str) {
        let target = session.target();
        let prefix = match target.owner_prefix(session.params()) {
            Ok(prefix) => prefix,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot resolve previous uploads");
                return;
            }
        };

        let entries = match self
            .storage
            .list(&target.bucket, &prefix, &ListOptions::default())
            .await
        {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(bucket = %target.bucket, prefix = %prefix, error = %e, "Failed to list previous uploads");
                return;
            }
        };

        let paths: Vec<String> = entries
            .iter()
            .map(|entry| join_path(&prefix, &entry.name))
            .filter(|path| path != new_key)
            .collect();
        if paths.is_empty() {
            return;
        }

        match self.storage.remove(&target.bucket, &paths).await {
            Ok(()) => tracing::info!(
                bucket = %target.bucket,
                prefix = %prefix,
                count = paths.len(),
                "Removed previous uploads"
            ),
            Err(e) => tracing::warn!(
                bucket = %target.bucket,
                prefix = %prefix,
                error = %e,
                "Failed to remove previous uploads"
            ),
        }
    }

    /// Delete a finished upload (if any) and clear the session.
    ///
    /// The delete is best-effort; the session is cleared whatever happens, so calling this
    /// again is harmless.
    pub async fn remove(&self, session: &mut UploadSession) {
        if let Some(outcome) = session.outcome() {
            if let Err(e) = self
                .storage
                .remove(&outcome.bucket, &[outcome.path.clone()])
                .await
            {
                tracing::warn!(
                    session = %session.id(),
                    bucket = %outcome.bucket,
                    key = %outcome.path,
                    error = %e,
                    "Failed to delete uploaded file"
                );
            }
        }
        session.clear();
    }

    /// Validate and upload several files one after another.
    pub async fn upload_many(
        &self,
        files: Vec<FileHandle>,
        target: &UploadTarget,
        params: &PathParams,
        progress: &ProgressReporter,
    ) -> Vec<Result<UploadSession, UploadError>> {
        let mut results = Vec::with_capacity(files.len());
        for file in files {
            let result = match self.select(file, target.clone(), params.clone()) {
                Ok(mut session) => {
                    if matches!(session.state(), UploadState::Uploading { .. }) {
                        self.upload(&mut session, progress).await.map(|_| session)
                    } else {
                        Ok(session)
                    }
                }
                Err(e) => Err(e),
            };
            results.push(result);
        }
        results
    }

    /// Objects directly under `prefix`, newest first.
    pub async fn list_files(
        &self,
        bucket: &str,
        prefix: &str,
        options: &ListOptions,
    ) -> Result<Vec<ObjectEntry>, UploadError> {
        Ok(self.storage.list(bucket, prefix, options).await?)
    }

    /// Time-limited URL for a private object. Defaults to the configured expiry.
    pub async fn download_url(
        &self,
        bucket: &str,
        path: &str,
        expires_in: Option<Duration>,
    ) -> Result<String, UploadError> {
        let expiry = expires_in.unwrap_or(self.settings.signed_url_expiry);
        Ok(self.storage.create_signed_url(bucket, path, expiry).await?)
    }

    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        self.storage.public_url(bucket, path)
    }

    pub async fn delete_file(&self, bucket: &str, path: &str) -> Result<(), UploadError> {
        self.storage.remove(bucket, &[path.to_string()]).await?;
        tracing::info!(bucket = %bucket, key = %path, "File deleted");
        Ok(())
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_core::TargetKind;
    use campus_storage::MemoryStorage;

    fn service(storage: Arc<MemoryStorage>) -> UploadService {
        UploadService::new(storage, UploadSettings::default())
    }

    #[tokio::test]
    async fn select_generates_key_under_target_prefix() {
        let storage = Arc::new(MemoryStorage::new());
        let service = service(storage.clone());
        let session = service
            .select(
                FileHandle::new("Intro Video.png", "image/png", vec![0; 10]),
                UploadTarget::for_kind(TargetKind::CourseImage),
                PathParams::course("42"),
            )
            .unwrap();

        let key = session.storage_key().unwrap();
        assert!(key.starts_with("courses/42/Intro-Video-"), "{}", key);
        assert!(key.ends_with(".png"));
        assert_eq!(storage.upload_calls(), 0);
    }

    #[tokio::test]
    async fn missing_path_param_is_an_error() {
        let service = service(Arc::new(MemoryStorage::new()));
        let result = service.select(
            FileHandle::new("a.pdf", "application/pdf", vec![1]),
            UploadTarget::for_kind(TargetKind::Certificate),
            PathParams::course("1"),
        );
        assert!(matches!(result, Err(UploadError::Validation(_))));
    }

    #[tokio::test]
    async fn private_targets_get_signed_urls() {
        let storage = Arc::new(MemoryStorage::new().with_base_url("http://files.test"));
        let service = service(storage.clone());
        let mut session = service
            .select(
                FileHandle::new("cert.pdf", "application/pdf", b"%PDF".to_vec()),
                UploadTarget::for_kind(TargetKind::Certificate),
                PathParams::certificate("s1", "c1"),
            )
            .unwrap();

        let state = service
            .upload(&mut session, &ProgressReporter::default())
            .await
            .unwrap();
        match state {
            UploadState::Succeeded(outcome) => {
                assert!(outcome.url.contains("?expires="));
                assert!(outcome.path.starts_with("students/s1/certificates/c1/cert-"));
                assert_eq!(outcome.bucket, "certificates");
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test]
    async fn upload_refuses_rejected_session() {
        let service = service(Arc::new(MemoryStorage::new()));
        let mut session = service
            .select(
                FileHandle::new("a.gif", "image/gif", vec![1]),
                UploadTarget::for_kind(TargetKind::Avatar),
                PathParams::user("u1"),
            )
            .unwrap();
        let result = service
            .upload(&mut session, &ProgressReporter::default())
            .await;
        assert!(matches!(
            result,
            Err(UploadError::InvalidTransition { from: "rejected", .. })
        ));
    }

    #[test]
    fn join_path_handles_empty_prefix() {
        assert_eq!(join_path("", "a.png"), "a.png");
        assert_eq!(join_path("users/1/", "a.png"), "users/1/a.png");
    }
}
