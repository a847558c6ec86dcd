use anyhow::Context;
use campus_core::{FileHandle, PathParams};
use campus_upload::{mime_for_extension, UploadSession, UploadState};
use serde_json::{json, Value};
use std::path::Path;

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Content type from the file extension; `application/octet-stream` when unknown.
pub fn guess_mime(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(mime_for_extension)
        .unwrap_or("application/octet-stream")
}

/// Read a file from disk into a handle, as a file picker would hand it over.
pub fn load_file(path: &Path) -> anyhow::Result<FileHandle> {
    let data = std::fs::read(path).with_context(|| format!("Read {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file")
        .to_string();
    Ok(FileHandle::new(name, guess_mime(path), data))
}

pub fn path_params(
    course_id: Option<String>,
    student_id: Option<String>,
    user_id: Option<String>,
    folder: Option<String>,
) -> PathParams {
    PathParams {
        course_id,
        student_id,
        user_id,
        folder,
    }
}

/// JSON summary of where a session ended up.
pub fn session_report(session: &UploadSession) -> Value {
    let base = json!({
        "session": session.id().to_string(),
        "file": session.file().name,
        "target": session.target().kind,
        "state": session.state().name(),
    });
    let detail = match session.state() {
        UploadState::Succeeded(outcome) => json!({ "outcome": outcome }),
        UploadState::Failed(failure) => json!({
            "failure": failure,
            "message": failure.kind.user_message(),
        }),
        UploadState::Rejected(rejection) => json!({ "reason": rejection.to_string() }),
        UploadState::Uploading { storage_key } => json!({ "storage_key": storage_key }),
        UploadState::Idle | UploadState::Validating => json!({}),
    };
    merge(base, detail)
}

fn merge(mut base: Value, extra: Value) -> Value {
    if let (Some(target), Value::Object(extra)) = (base.as_object_mut(), extra) {
        target.extend(extra);
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_core::{TargetKind, UploadTarget};
    use std::io::Write;

    #[test]
    fn guess_mime_by_extension() {
        assert_eq!(guess_mime(Path::new("logo.PNG")), "image/png");
        assert_eq!(guess_mime(Path::new("notes.pdf")), "application/pdf");
        assert_eq!(guess_mime(Path::new("archive")), "application/octet-stream");
        assert_eq!(guess_mime(Path::new("data.xyz")), "application/octet-stream");
    }

    #[test]
    fn load_file_reads_size_and_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portada.jpg");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(&[0u8; 2048])
            .unwrap();

        let file = load_file(&path).unwrap();
        assert_eq!(file.name, "portada.jpg");
        assert_eq!(file.declared_size, 2048);
        assert_eq!(file.mime_type, "image/jpeg");
    }

    #[test]
    fn load_missing_file_fails() {
        assert!(load_file(Path::new("/nonexistent/file.png")).is_err());
    }

    #[test]
    fn report_for_idle_session() {
        let session = UploadSession::new(
            FileHandle::new("a.png", "image/png", vec![1]),
            UploadTarget::for_kind(TargetKind::CourseImage),
            PathParams::course("c1"),
        );
        let report = session_report(&session);
        assert_eq!(report["state"], "idle");
        assert_eq!(report["target"], "course-image");
        assert_eq!(report["file"], "a.png");
    }
}
