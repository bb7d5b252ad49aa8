//! Shared data models for the VodStream processing backend.
//!
//! This crate provides Serde-serializable types for:
//! - Encode and subtitle job payloads
//! - Media unit and subtitle record state machines
//! - The quality-ladder catalog
//! - Progress event schemas consumed by the API layer

pub mod event;
pub mod job;
pub mod media;
pub mod quality;
pub mod subtitle;
pub mod utils;

// Re-export common types
pub use event::JobEvent;
pub use job::{EncodeJob, JobId, SubtitleJob, AUTO_LANGUAGE};
pub use media::{EncodingStatus, MediaId, MediaUnit};
pub use quality::{select_rungs, QualityRung, QUALITY_LADDER};
pub use subtitle::{SubtitleId, SubtitleRecord, SubtitleStatus};
pub use utils::{truncate_error, MAX_ERROR_LEN};
