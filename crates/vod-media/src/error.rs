//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("whisper not found in PATH")]
    WhisperNotFound,

    #[error("{program} failed: {message}")]
    CommandFailed {
        program: String,
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("{program} timed out after {seconds} seconds")]
    Timeout { program: String, seconds: u64 },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid media file: {0}")]
    InvalidMedia(String),

    #[error("Output verification failed: {0}")]
    OutputVerification(String),

    #[error("All {attempted} encode attempts exhausted for {context}: {last_error}")]
    StrategiesExhausted {
        context: String,
        attempted: usize,
        last_error: String,
    },

    #[error("Subtitle parse error: {0}")]
    SubtitleParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create a command failure error with truncated stderr.
    pub fn command_failed(
        program: impl Into<String>,
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::CommandFailed {
            program: program.into(),
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an output verification error.
    pub fn verification(message: impl Into<String>) -> Self {
        Self::OutputVerification(message.into())
    }

    /// Create a subtitle parse error.
    pub fn subtitle_parse(message: impl Into<String>) -> Self {
        Self::SubtitleParse(message.into())
    }
}
