//! Progress event schema published to the UI and CRUD layer.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::job::JobId;

/// A job progress event.
///
/// Emitted at every state transition and at intermediate percentage
/// milestones. Consumers treat an event carrying a terminal status as the
/// last event for that job instance.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobEvent {
    /// Job this event belongs to
    #[serde(rename = "jobId")]
    pub job_id: JobId,

    /// Status string ("processing", "transcribing", ...)
    pub status: String,

    /// Progress (0-100)
    pub progress: u8,

    /// Error message, present only on failure events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobEvent {
    /// Create a status/progress event.
    pub fn status(job_id: &JobId, status: impl Into<String>, progress: u8) -> Self {
        Self {
            job_id: job_id.clone(),
            status: status.into(),
            progress: progress.min(100),
            error: None,
        }
    }

    /// Create a completion event (progress pinned to 100).
    pub fn completed(job_id: &JobId, status: impl Into<String>) -> Self {
        Self {
            job_id: job_id.clone(),
            status: status.into(),
            progress: 100,
            error: None,
        }
    }

    /// Create a failure event carrying the (already truncated) message.
    pub fn failed(
        job_id: &JobId,
        status: impl Into<String>,
        progress: u8,
        error: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.clone(),
            status: status.into(),
            progress: progress.min(100),
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_shape() {
        let id = JobId::from_string("job-1");
        let event = JobEvent::status(&id, "processing", 42);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"jobId\":\"job-1\""));
        assert!(json.contains("\"progress\":42"));
        assert!(!json.contains("error"));
    }

    #[test]
    fn test_progress_clamped() {
        let id = JobId::new();
        let event = JobEvent::status(&id, "processing", 250);
        assert_eq!(event.progress, 100);
    }

    #[test]
    fn test_failure_event_carries_error() {
        let id = JobId::new();
        let event = JobEvent::failed(&id, "failed", 30, "probe exploded");
        assert_eq!(event.error.as_deref(), Some("probe exploded"));
        assert_eq!(event.progress, 30);
    }
}
