//! Structured job logging.

use tracing::{error, info, warn};

use vod_models::JobId;

/// Logger stamping job ID and pipeline on lifecycle events.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    pipeline: String,
}

impl JobLogger {
    /// Create a logger for a job in a pipeline ("encode", "subtitle").
    pub fn new(job_id: &JobId, pipeline: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            pipeline: pipeline.to_string(),
        }
    }

    pub fn start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            pipeline = %self.pipeline,
            "Job started: {}", message
        );
    }

    pub fn stage(&self, stage: &str, message: &str) {
        info!(
            job_id = %self.job_id,
            pipeline = %self.pipeline,
            stage = %stage,
            "{}", message
        );
    }

    pub fn warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            pipeline = %self.pipeline,
            "Job warning: {}", message
        );
    }

    pub fn failure(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            pipeline = %self.pipeline,
            "Job failed: {}", message
        );
    }

    pub fn completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            pipeline = %self.pipeline,
            "Job completed: {}", message
        );
    }
}
