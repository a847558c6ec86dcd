//! Upload session state machine.
//!
//! ```text
//! Idle -> Validating -> Rejected
//!                    -> Uploading -> Succeeded
//!                                 -> Failed
//! ```
//!
//! Every transition goes through a method that checks the current state; anything else is
//! an `UploadError::InvalidTransition`. `clear` returns a session to `Idle` from any state.

use crate::error::UploadError;
use crate::validator::Rejection;
use campus_core::{FileHandle, PathParams, UploadTarget};
use campus_storage::FailureKind;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SessionId(u64);

impl SessionId {
    fn next() -> Self {
        SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "upload-{}", self.0)
    }
}

/// Where a finished upload lives and how to fetch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    pub bucket: String,
    pub path: String,
    pub url: String,
    pub object_name: String,
}

/// Classified reason an upload did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadFailure {
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Validating,
    Rejected(Rejection),
    Uploading { storage_key: String },
    Succeeded(UploadOutcome),
    Failed(UploadFailure),
}

impl UploadState {
    pub fn name(&self) -> &'static str {
        match self {
            UploadState::Idle => "idle",
            UploadState::Validating => "validating",
            UploadState::Rejected(_) => "rejected",
            UploadState::Uploading { .. } => "uploading",
            UploadState::Succeeded(_) => "succeeded",
            UploadState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadState::Rejected(_) | UploadState::Succeeded(_) | UploadState::Failed(_)
        )
    }
}

/// What the widget shows for the selected file before and during the upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
}

/// One user-initiated file selection.
#[derive(Debug, Clone)]
pub struct UploadSession {
    id: SessionId,
    file: FileHandle,
    target: UploadTarget,
    params: PathParams,
    state: UploadState,
    storage_key: Option<String>,
    object_name: Option<String>,
    preview: Option<Preview>,
}

impl UploadSession {
    pub fn new(file: FileHandle, target: UploadTarget, params: PathParams) -> Self {
        Self {
            id: SessionId::next(),
            file,
            target,
            params,
            state: UploadState::Idle,
            storage_key: None,
            object_name: None,
            preview: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn file(&self) -> &FileHandle {
        &self.file
    }

    pub fn target(&self) -> &UploadTarget {
        &self.target
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    /// Object path fixed when the session entered `Uploading`.
    pub fn storage_key(&self) -> Option<&str> {
        self.storage_key.as_deref()
    }

    pub fn object_name(&self) -> Option<&str> {
        self.object_name.as_deref()
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    pub fn outcome(&self) -> Option<&UploadOutcome> {
        match &self.state {
            UploadState::Succeeded(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&UploadFailure> {
        match &self.state {
            UploadState::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match &self.state {
            UploadState::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }

    fn invalid(&self, to: &'static str) -> UploadError {
        UploadError::InvalidTransition {
            from: self.state.name(),
            to,
        }
    }

    pub(crate) fn begin_validation(&mut self) -> Result<(), UploadError> {
        match self.state {
            UploadState::Idle => {
                self.state = UploadState::Validating;
                Ok(())
            }
            _ => Err(self.invalid("validating")),
        }
    }

    pub(crate) fn reject(&mut self, rejection: Rejection) -> Result<(), UploadError> {
        match self.state {
            UploadState::Validating => {
                self.state = UploadState::Rejected(rejection);
                Ok(())
            }
            _ => Err(self.invalid("rejected")),
        }
    }

    /// Validation passed: fix the storage key and show the preview.
    pub(crate) fn start_upload(
        &mut self,
        object_name: String,
        storage_key: String,
    ) -> Result<(), UploadError> {
        match self.state {
            UploadState::Validating => {
                self.preview = Some(Preview {
                    name: self.file.name.clone(),
                    mime_type: self.file.mime_type.clone(),
                    size: self.file.declared_size,
                });
                self.object_name = Some(object_name);
                self.storage_key = Some(storage_key.clone());
                self.state = UploadState::Uploading { storage_key };
                Ok(())
            }
            _ => Err(self.invalid("uploading")),
        }
    }

    pub(crate) fn succeed(&mut self, outcome: UploadOutcome) -> Result<(), UploadError> {
        match self.state {
            UploadState::Uploading { .. } => {
                self.state = UploadState::Succeeded(outcome);
                Ok(())
            }
            _ => Err(self.invalid("succeeded")),
        }
    }

    pub(crate) fn fail(&mut self, failure: UploadFailure) -> Result<(), UploadError> {
        match self.state {
            UploadState::Uploading { .. } => {
                self.state = UploadState::Failed(failure);
                Ok(())
            }
            _ => Err(self.invalid("failed")),
        }
    }

    /// Drop the preview, the generated key and any result. Safe to call repeatedly.
    pub(crate) fn clear(&mut self) {
        self.state = UploadState::Idle;
        self.storage_key = None;
        self.object_name = None;
        self.preview = None;
    }
}
