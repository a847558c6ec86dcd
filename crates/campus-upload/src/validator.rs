use campus_core::models::{readable_types, MissingPathParam};
use campus_core::{format_file_size, FileHandle, UploadTarget};
use std::fmt;

/// Why a selected file was refused before any network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    TooLarge { size: u64, max: u64 },
    TypeNotAllowed { mime: String, allowed: Vec<String> },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::TooLarge { size, max } => write!(
                f,
                "File exceeds maximum size ({} > {})",
                format_file_size(*size),
                format_file_size(*max)
            ),
            Rejection::TypeNotAllowed { mime, allowed } => write!(
                f,
                "File type not allowed ({}; accepted: {})",
                if mime.is_empty() { "unknown" } else { mime.as_str() },
                readable_types(allowed.iter().map(String::as_str))
            ),
        }
    }
}

impl std::error::Error for Rejection {}

/// Outcome of validating a file against a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Proceed,
    Rejected(Rejection),
}

impl Verdict {
    pub fn is_proceed(&self) -> bool {
        matches!(self, Verdict::Proceed)
    }
}

/// Validation failures raised while preparing an upload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error(transparent)]
    MissingPathParam(#[from] MissingPathParam),
}

/// Validate file size against the target limit
pub fn validate_file_size(size: u64, target: &UploadTarget) -> Result<(), Rejection> {
    if size > target.max_size_bytes {
        return Err(Rejection::TooLarge {
            size,
            max: target.max_size_bytes,
        });
    }
    Ok(())
}

/// Validate content type. The declared type must be one of the target's types exactly.
pub fn validate_content_type(mime_type: &str, target: &UploadTarget) -> Result<(), Rejection> {
    if mime_type.is_empty() || !target.allows(mime_type) {
        return Err(Rejection::TypeNotAllowed {
            mime: mime_type.to_string(),
            allowed: target.allowed_mime_types.iter().cloned().collect(),
        });
    }
    Ok(())
}

/// Validate a file against a target: size first, then type. Pure; no I/O.
pub fn validate(file: &FileHandle, target: &UploadTarget) -> Verdict {
    match validate_file_size(file.declared_size, target)
        .and_then(|_| validate_content_type(&file.mime_type, target))
    {
        Ok(()) => Verdict::Proceed,
        Err(rejection) => Verdict::Rejected(rejection),
    }
}

/// Content type for a file extension, for callers that only have a path on disk.
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    let mime = match extension.to_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "zip" => "application/zip",
        _ => return None,
    };
    Some(mime)
}
