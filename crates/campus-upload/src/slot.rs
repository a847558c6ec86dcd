//! Single-file upload widget model.
//!
//! A slot holds at most one session. Selecting a new file replaces the current session even
//! while an upload is in flight. The storage call of the replaced session is not cancelled;
//! when it completes its result is discarded because its ticket belongs to an older
//! generation. At most one stale completion per replacement can reach storage.

use crate::error::UploadError;
use crate::progress::ProgressReporter;
use crate::service::UploadService;
use crate::session::{UploadSession, UploadState};
use campus_core::{FileHandle, PathParams, UploadTarget};
use serde::Serialize;

/// Identifies the session a caller is working on; stale tickets are refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotTicket {
    generation: u64,
}

/// A file already attached to the record being edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExistingFile {
    pub url: String,
    pub name: String,
}

/// What the widget renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SlotView {
    Empty,
    Existing { url: String, name: String },
    Uploading { name: String, size: u64 },
    Uploaded { url: String, name: String },
    Rejected { message: String },
    Failed { name: Option<String>, message: String },
}

#[derive(Debug, Default)]
pub struct UploadSlot {
    generation: u64,
    session: Option<UploadSession>,
    existing: Option<ExistingFile>,
}

impl UploadSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&UploadSession> {
        self.session.as_ref()
    }

    pub fn state(&self) -> Option<&UploadState> {
        self.session.as_ref().map(UploadSession::state)
    }

    /// Show a file that was uploaded earlier (edit forms).
    pub fn set_existing(&mut self, url: impl Into<String>, name: impl Into<String>) {
        self.generation += 1;
        self.session = None;
        self.existing = Some(ExistingFile {
            url: url.into(),
            name: name.into(),
        });
    }

    /// Validate `file` and make it the slot's session, replacing whatever was there.
    pub fn select(
        &mut self,
        service: &UploadService,
        file: FileHandle,
        target: UploadTarget,
        params: PathParams,
    ) -> Result<SlotTicket, UploadError> {
        let session = service.select(file, target, params)?;
        if let Some(previous) = &self.session {
            if matches!(previous.state(), UploadState::Uploading { .. }) {
                tracing::info!(
                    replaced = %previous.id(),
                    replacement = %session.id(),
                    "Replacing session with an upload in flight"
                );
            }
        }
        self.generation += 1;
        self.session = Some(session);
        Ok(SlotTicket {
            generation: self.generation,
        })
    }

    /// Copy of the session to upload, if `ticket` is current and the session is ready.
    pub fn checkout(&self, ticket: SlotTicket) -> Option<UploadSession> {
        if ticket.generation != self.generation {
            return None;
        }
        self.session
            .as_ref()
            .filter(|s| matches!(s.state(), UploadState::Uploading { .. }))
            .cloned()
    }

    /// Apply a finished upload. Returns false (and drops it) when the slot has moved on.
    pub fn complete(&mut self, ticket: SlotTicket, session: UploadSession) -> bool {
        if ticket.generation != self.generation {
            tracing::info!(
                session = %session.id(),
                state = session.state().name(),
                "Discarding completion of a replaced upload"
            );
            return false;
        }
        if matches!(session.state(), UploadState::Succeeded(_)) {
            self.existing = None;
        }
        self.session = Some(session);
        true
    }

    /// Select a file and upload it right away.
    pub async fn select_and_upload(
        &mut self,
        service: &UploadService,
        file: FileHandle,
        target: UploadTarget,
        params: PathParams,
        progress: &ProgressReporter,
    ) -> Result<Option<&UploadState>, UploadError> {
        let ticket = self.select(service, file, target, params)?;
        if let Some(mut session) = self.checkout(ticket) {
            service.upload(&mut session, progress).await?;
            self.complete(ticket, session);
        }
        Ok(self.state())
    }

    /// Delete the uploaded file (best-effort) and empty the slot. Idempotent.
    pub async fn remove(&mut self, service: &UploadService) {
        self.generation += 1;
        if let Some(mut session) = self.session.take() {
            service.remove(&mut session).await;
        }
        self.existing = None;
    }

    pub fn view(&self) -> SlotView {
        if let Some(session) = &self.session {
            return match session.state() {
                UploadState::Idle | UploadState::Validating => SlotView::Empty,
                UploadState::Rejected(rejection) => SlotView::Rejected {
                    message: rejection.to_string(),
                },
                UploadState::Uploading { .. } => SlotView::Uploading {
                    name: session.file().name.clone(),
                    size: session.file().declared_size,
                },
                UploadState::Succeeded(outcome) => SlotView::Uploaded {
                    url: outcome.url.clone(),
                    name: session.file().name.clone(),
                },
                UploadState::Failed(failure) => SlotView::Failed {
                    name: session.preview().map(|p| p.name.clone()),
                    message: failure.kind.user_message().to_string(),
                },
            };
        }
        match &self.existing {
            Some(existing) => SlotView::Existing {
                url: existing.url.clone(),
                name: existing.name.clone(),
            },
            None => SlotView::Empty,
        }
    }
}
