//! Subtitle record models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::media::MediaId;
use crate::utils::truncate_error;

/// Unique identifier for a subtitle record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SubtitleId(pub String);

impl SubtitleId {
    /// Generate a new random subtitle ID.
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

impl Default for SubtitleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubtitleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subtitle generation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleStatus {
    /// Request accepted, waiting for a worker
    #[default]
    Queued,
    /// Downloading source and extracting audio
    Extracting,
    /// Speech-to-text in progress
    Transcribing,
    /// Machine translation in progress (skipped when source == target)
    Translating,
    /// Uploading the finished track
    Uploading,
    /// Track produced successfully
    Completed,
    /// Generation failed
    Failed,
}

impl SubtitleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubtitleStatus::Queued => "queued",
            SubtitleStatus::Extracting => "extracting",
            SubtitleStatus::Transcribing => "transcribing",
            SubtitleStatus::Translating => "translating",
            SubtitleStatus::Uploading => "uploading",
            SubtitleStatus::Completed => "completed",
            SubtitleStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubtitleStatus::Completed | SubtitleStatus::Failed)
    }
}

impl fmt::Display for SubtitleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A subtitle track record.
///
/// At most one record exists per `(media_id, target_language)`; a new
/// request for the same key overwrites a terminal record and is rejected
/// while a non-terminal one is in flight.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SubtitleRecord {
    /// Unique subtitle ID
    pub subtitle_id: SubtitleId,

    /// Media unit this track belongs to
    pub media_id: MediaId,

    /// Sequence number of the media unit (part of the artifact key)
    pub sequence_number: u32,

    /// Declared source language ("auto" or ISO code)
    pub source_language: String,

    /// Target language (ISO code)
    pub target_language: String,

    /// Generation state machine
    #[serde(default)]
    pub status: SubtitleStatus,

    /// Progress (0-100)
    #[serde(default)]
    pub progress: u8,

    /// Error message (if failed), truncated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Final SRT text content (set on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// URL of the uploaded track (set on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_url: Option<String>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl SubtitleRecord {
    /// Create a queued record for an accepted generation request.
    pub fn new(
        media_id: MediaId,
        sequence_number: u32,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            subtitle_id: SubtitleId::new(),
            media_id,
            sequence_number,
            source_language: source_language.into(),
            target_language: target_language.into(),
            status: SubtitleStatus::Queued,
            progress: 0,
            error: None,
            content: None,
            track_url: None,
            updated_at: Utc::now(),
        }
    }

    /// Move to a new non-terminal stage.
    pub fn set_stage(&mut self, status: SubtitleStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Mark as completed with the final content and track URL.
    pub fn complete(&mut self, content: impl Into<String>, track_url: impl Into<String>) {
        self.status = SubtitleStatus::Completed;
        self.progress = 100;
        self.error = None;
        self.content = Some(content.into());
        self.track_url = Some(track_url.into());
        self.updated_at = Utc::now();
    }

    /// Mark as failed with a truncated error message.
    pub fn fail(&mut self, error: impl AsRef<str>) {
        self.status = SubtitleStatus::Failed;
        self.error = Some(truncate_error(error.as_ref()));
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminality() {
        assert!(SubtitleStatus::Completed.is_terminal());
        assert!(SubtitleStatus::Failed.is_terminal());
        assert!(!SubtitleStatus::Queued.is_terminal());
        assert!(!SubtitleStatus::Translating.is_terminal());
    }

    #[test]
    fn test_record_lifecycle() {
        let mut rec = SubtitleRecord::new(MediaId::new(), 2, "auto", "es");
        assert_eq!(rec.status, SubtitleStatus::Queued);

        rec.set_stage(SubtitleStatus::Extracting);
        rec.set_stage(SubtitleStatus::Transcribing);
        rec.complete("1\n00:00:00,000 --> 00:00:01,000\nHola\n", "https://cdn/x/2/es.srt");

        assert_eq!(rec.status, SubtitleStatus::Completed);
        assert_eq!(rec.progress, 100);
        assert!(rec.content.is_some());
        assert!(rec.track_url.is_some());
    }
}
