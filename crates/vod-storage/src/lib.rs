//! S3-compatible object store gateway.
//!
//! This crate provides:
//! - Blob upload/download by key
//! - Existence/metadata checks
//! - Presigned download URL generation
//! - Recursive directory upload for encoded rung output

pub mod client;
pub mod content_type;
pub mod error;

pub use client::{ObjectStat, ObjectStore, StoreConfig};
pub use content_type::content_type_for;
pub use error::{StorageError, StorageResult};
