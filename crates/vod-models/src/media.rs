//! Media unit models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::utils::truncate_error;

/// Unique identifier for a media unit (an episode, a movie, a trailer).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct MediaId(pub String);

impl MediaId {
    /// Generate a new random media ID.
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

impl Default for MediaId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MediaId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MediaId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Encoding status of a media unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum EncodingStatus {
    /// Source uploaded, waiting for a worker
    #[default]
    Pending,
    /// A worker is encoding this unit
    Processing,
    /// Adaptive asset produced successfully
    Completed,
    /// Encoding failed
    Failed,
}

impl EncodingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncodingStatus::Pending => "pending",
            EncodingStatus::Processing => "processing",
            EncodingStatus::Completed => "completed",
            EncodingStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, EncodingStatus::Completed | EncodingStatus::Failed)
    }

    /// Whether an encode run may begin from this state.
    ///
    /// Processing may only be entered from Pending or Failed. A unit
    /// already owned by a worker rejects a second run, and a Completed
    /// unit must first be reset to Pending by the owning layer before a
    /// re-encode (which then overwrites the same artifact keys).
    pub fn can_begin_encode(&self) -> bool {
        matches!(self, EncodingStatus::Pending | EncodingStatus::Failed)
    }
}

impl fmt::Display for EncodingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The slice of a media unit the processing pipeline owns.
///
/// Structural fields (title, pricing, ...) belong to the CRUD layer and
/// never appear here.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MediaUnit {
    /// Unique media ID
    pub media_id: MediaId,

    /// Sequence number of the unit within its parent (episode number);
    /// part of the artifact key scheme
    pub sequence_number: u32,

    /// Object store key of the raw upload
    pub source_key: String,

    /// Encoding state machine
    #[serde(default)]
    pub encoding_status: EncodingStatus,

    /// Encoding progress (0-100)
    #[serde(default)]
    pub encoding_progress: u8,

    /// Error message (if failed), truncated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding_error: Option<String>,

    /// URL of the master playlist (set on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_url: Option<String>,

    /// Measured duration in seconds (set on success)
    #[serde(default)]
    pub duration_seconds: f64,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl MediaUnit {
    /// Create a pending unit for a fresh upload.
    pub fn new(media_id: MediaId, sequence_number: u32, source_key: impl Into<String>) -> Self {
        Self {
            media_id,
            sequence_number,
            source_key: source_key.into(),
            encoding_status: EncodingStatus::Pending,
            encoding_progress: 0,
            encoding_error: None,
            manifest_url: None,
            duration_seconds: 0.0,
            updated_at: Utc::now(),
        }
    }

    /// Transition into Processing, resetting progress and prior error.
    pub fn begin_processing(&mut self) {
        self.encoding_status = EncodingStatus::Processing;
        self.encoding_progress = 0;
        self.encoding_error = None;
        self.updated_at = Utc::now();
    }

    /// Mark as completed with the final manifest URL and duration.
    pub fn complete(&mut self, manifest_url: impl Into<String>, duration_seconds: f64) {
        self.encoding_status = EncodingStatus::Completed;
        self.encoding_progress = 100;
        self.encoding_error = None;
        self.manifest_url = Some(manifest_url.into());
        self.duration_seconds = duration_seconds;
        self.updated_at = Utc::now();
    }

    /// Mark as failed with a truncated error message.
    pub fn fail(&mut self, error: impl AsRef<str>) {
        self.encoding_status = EncodingStatus::Failed;
        self.encoding_error = Some(truncate_error(error.as_ref()));
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_id_generation() {
        let id1 = MediaId::new();
        let id2 = MediaId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_status_guards() {
        assert!(EncodingStatus::Pending.can_begin_encode());
        assert!(EncodingStatus::Failed.can_begin_encode());
        assert!(!EncodingStatus::Processing.can_begin_encode());
        assert!(!EncodingStatus::Completed.can_begin_encode());
        assert!(EncodingStatus::Completed.is_terminal());
        assert!(EncodingStatus::Failed.is_terminal());
        assert!(!EncodingStatus::Processing.is_terminal());
    }

    #[test]
    fn test_unit_transitions() {
        let mut unit = MediaUnit::new(MediaId::new(), 3, "uploads/raw.mp4");
        assert_eq!(unit.encoding_status, EncodingStatus::Pending);

        unit.begin_processing();
        assert_eq!(unit.encoding_status, EncodingStatus::Processing);
        assert_eq!(unit.encoding_progress, 0);

        unit.complete("https://cdn.example.com/m/3/master.m3u8", 1432.5);
        assert_eq!(unit.encoding_status, EncodingStatus::Completed);
        assert_eq!(unit.encoding_progress, 100);
        assert!(unit.manifest_url.is_some());
    }

    #[test]
    fn test_fail_truncates_error() {
        let mut unit = MediaUnit::new(MediaId::new(), 1, "uploads/raw.mp4");
        unit.begin_processing();
        unit.fail("e".repeat(4000));
        let err = unit.encoding_error.as_ref().unwrap();
        assert_eq!(err.chars().count(), crate::MAX_ERROR_LEN);
    }
}
