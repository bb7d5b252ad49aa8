//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Invalid source: {0}")]
    InvalidSource(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Media unit {0} is already processing")]
    AlreadyProcessing(String),

    #[error("Media unit cannot be encoded: {0}")]
    NotEncodable(String),

    #[error("Subtitle for {0} is already in flight")]
    DuplicateSubtitle(String),

    #[error("Translation batch returned {actual} segments, expected {expected}")]
    TranslationMismatch { expected: usize, actual: usize },

    #[error("Translation failed: {0}")]
    TranslationFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Media error: {0}")]
    Media(#[from] vod_media::MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] vod_storage::StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] vod_queue::QueueError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn invalid_source(msg: impl Into<String>) -> Self {
        Self::InvalidSource(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }

    /// Whether this error is a pre-flight rejection.
    ///
    /// Rejections mean another run owns the record (or it is gone); the
    /// pipeline must not write a Failed state over it.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            WorkerError::AlreadyProcessing(_)
                | WorkerError::NotEncodable(_)
                | WorkerError::DuplicateSubtitle(_)
                | WorkerError::RecordNotFound(_)
        )
    }
}
