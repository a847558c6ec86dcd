//! Domain models shared across crates

pub mod file;
pub mod target;

pub use file::{format_file_size, FileHandle};
pub use target::{readable_types, MissingPathParam, PathParams, TargetKind, UploadTarget, Visibility};
