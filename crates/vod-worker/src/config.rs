//! Worker configuration.

use std::time::Duration;

/// Pipelines a worker instance runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerRole {
    Encode,
    Subtitle,
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Roles this instance polls for
    pub roles: Vec<WorkerRole>,
    /// Work directory for per-job scratch areas
    pub work_dir: String,
    /// Blocking-pop timeout per poll
    pub poll_timeout: Duration,
    /// Timeout for a single encode attempt
    pub encode_timeout: Duration,
    /// Timeout for ffprobe
    pub probe_timeout: Duration,
    /// Timeout for a single audio extraction attempt
    pub extract_timeout: Duration,
    /// Timeout for whisper transcription
    pub transcribe_timeout: Duration,
    /// Timeout for a single store download/upload operation
    pub transfer_timeout: Duration,
    /// Cap on extracted audio duration (bounds transcription cost)
    pub audio_cap_secs: u32,
    /// Segments per translation batch
    pub translate_batch_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            roles: vec![WorkerRole::Encode, WorkerRole::Subtitle],
            work_dir: "/tmp/vod".to_string(),
            poll_timeout: Duration::from_secs(2),
            encode_timeout: Duration::from_secs(600), // 10 minutes per attempt
            probe_timeout: Duration::from_secs(30),
            extract_timeout: Duration::from_secs(300),
            transcribe_timeout: Duration::from_secs(600),
            transfer_timeout: Duration::from_secs(300),
            audio_cap_secs: 600,
            translate_batch_size: 50,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            roles: std::env::var("WORKER_ROLES")
                .map(|s| parse_roles(&s))
                .unwrap_or(defaults.roles),
            work_dir: std::env::var("WORKER_WORK_DIR").unwrap_or(defaults.work_dir),
            poll_timeout: env_secs("WORKER_POLL_TIMEOUT", defaults.poll_timeout),
            encode_timeout: env_secs("WORKER_ENCODE_TIMEOUT", defaults.encode_timeout),
            probe_timeout: env_secs("WORKER_PROBE_TIMEOUT", defaults.probe_timeout),
            extract_timeout: env_secs("WORKER_EXTRACT_TIMEOUT", defaults.extract_timeout),
            transcribe_timeout: env_secs("WORKER_TRANSCRIBE_TIMEOUT", defaults.transcribe_timeout),
            transfer_timeout: env_secs("WORKER_TRANSFER_TIMEOUT", defaults.transfer_timeout),
            audio_cap_secs: std::env::var("WORKER_AUDIO_CAP_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.audio_cap_secs),
            translate_batch_size: std::env::var("WORKER_TRANSLATE_BATCH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.translate_batch_size),
        }
    }
}

fn parse_roles(s: &str) -> Vec<WorkerRole> {
    let roles: Vec<WorkerRole> = s
        .split(',')
        .filter_map(|part| match part.trim().to_ascii_lowercase().as_str() {
            "encode" => Some(WorkerRole::Encode),
            "subtitle" => Some(WorkerRole::Subtitle),
            _ => None,
        })
        .collect();

    if roles.is_empty() {
        vec![WorkerRole::Encode, WorkerRole::Subtitle]
    } else {
        roles
    }
}

fn env_secs(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
