//! Campus Core Library
//!
//! This crate provides the configuration, error types, upload target models and
//! view navigation shared by the campus storage, upload, data and offline crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod navigation;
pub mod storage_types;

// Re-export commonly used types
pub use config::{CampusConfig, Config};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    format_file_size, readable_types, FileHandle, MissingPathParam, PathParams, TargetKind,
    UploadTarget, Visibility,
};
pub use navigation::{DashboardRoute, DashboardRouter, ViewStack};
pub use storage_types::StorageBackend;
