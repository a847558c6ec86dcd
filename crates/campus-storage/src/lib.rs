//! Campus Storage Library
//!
//! This crate provides the object storage abstraction used by the upload pipeline and its
//! backends: the hosted storage REST API, the local filesystem and an in-memory store.
//!
//! # Object paths
//!
//! Objects are addressed by `(bucket, path)`. Paths are relative (`courses/42/intro-1700000000000-k3j9.png`),
//! must not contain `..` and must not start with `/`. Object names are generated in the
//! `keys` module so every backend sees the same layout.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
#[cfg(feature = "storage-rest")]
pub mod rest;
pub mod traits;

// Re-export commonly used types
pub use campus_core::StorageBackend;
pub use factory::create_storage;
pub use keys::{generate_object_name, validate_object_path};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use memory::MemoryStorage;
#[cfg(feature = "storage-rest")]
pub use rest::RestStorage;
pub use traits::{
    FailureKind, ListOptions, ObjectEntry, ObjectStorage, SortBy, SortColumn, SortOrder,
    StorageError, StorageResult, StoredObject, UploadOptions,
};
