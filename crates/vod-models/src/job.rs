//! Job payloads for queue processing.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::media::MediaId;
use crate::subtitle::SubtitleId;

/// Sentinel source language requesting transcriber auto-detection.
pub const AUTO_LANGUAGE: &str = "auto";

/// Unique identifier for a job delivery.
///
/// Also namespaces the worker's scratch area, so two concurrent jobs for
/// the same media unit never share paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job to encode an uploaded source into an adaptive streaming asset.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EncodeJob {
    /// Unique job ID
    pub job_id: JobId,
    /// Media unit to encode
    pub media_id: MediaId,
    /// Object store key of the raw upload
    pub source_key: String,
    /// When the CRUD layer accepted the request
    pub requested_at: DateTime<Utc>,
}

impl EncodeJob {
    pub fn new(media_id: MediaId, source_key: impl Into<String>) -> Self {
        Self {
            job_id: JobId::new(),
            media_id,
            source_key: source_key.into(),
            requested_at: Utc::now(),
        }
    }
}

/// Job to generate (and optionally translate) a subtitle track.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SubtitleJob {
    /// Unique job ID
    pub job_id: JobId,
    /// Subtitle record this job fulfils
    pub subtitle_id: SubtitleId,
    /// Media unit the track belongs to
    pub media_id: MediaId,
    /// Object store key of the raw upload
    pub source_key: String,
    /// Declared source language ("auto" for detection)
    pub source_language: String,
    /// Target language
    pub target_language: String,
}

impl SubtitleJob {
    pub fn new(
        subtitle_id: SubtitleId,
        media_id: MediaId,
        source_key: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            job_id: JobId::new(),
            subtitle_id,
            media_id,
            source_key: source_key.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
        }
    }

    /// Whether the job declares its source language as auto-detect.
    pub fn is_auto_language(&self) -> bool {
        self.source_language.eq_ignore_ascii_case(AUTO_LANGUAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_job_roundtrip() {
        let job = EncodeJob::new(MediaId::from_string("m1"), "uploads/m1/raw.mp4");
        let json = serde_json::to_string(&job).unwrap();
        let back: EncodeJob = serde_json::from_str(&json).unwrap();
        assert_eq!(back.media_id, job.media_id);
        assert_eq!(back.source_key, "uploads/m1/raw.mp4");
    }

    #[test]
    fn test_subtitle_job_auto_language() {
        let job = SubtitleJob::new(
            SubtitleId::new(),
            MediaId::new(),
            "uploads/raw.mp4",
            "AUTO",
            "fr",
        );
        assert!(job.is_auto_language());

        let job = SubtitleJob::new(SubtitleId::new(), MediaId::new(), "k", "en", "fr");
        assert!(!job.is_auto_language());
    }
}
