//! Upload validation and lifecycle.
//!
//! No file reaches object storage unless it passes its target's size and type policy.
//! `UploadService` drives an `UploadSession` through
//! `Idle -> Validating -> (Rejected | Uploading -> (Succeeded | Failed))`, with a simulated
//! progress indicator alongside. `UploadSlot` models a single-file widget on top of it.

pub mod error;
pub mod progress;
pub mod service;
pub mod session;
pub mod slot;
pub mod validator;

pub use error::UploadError;
pub use progress::{Progress, ProgressReporter, SimulatedProgress};
pub use service::{UploadService, UploadSettings};
pub use session::{Preview, SessionId, UploadFailure, UploadOutcome, UploadSession, UploadState};
pub use slot::{ExistingFile, SlotTicket, SlotView, UploadSlot};
pub use validator::{
    mime_for_extension, validate, validate_content_type, validate_file_size, Rejection,
    ValidationError, Verdict,
};
