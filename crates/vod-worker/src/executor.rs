//! Worker poll loops.
//!
//! One loop per pipeline: block-pop one job, process it fully, poll
//! again. The queue pop is the sole concurrency-control point; there is
//! no shared in-flight flag. A job failure is absorbed and logged; the
//! loop survives bad input indefinitely.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use vod_models::{EncodeJob, SubtitleJob};
use vod_queue::{JobQueue, ProgressChannel, StatusBoard, ENCODE_TOPIC, SUBTITLE_TOPIC};
use vod_storage::ObjectStore;

use crate::config::WorkerConfig;
use crate::encode::Transcoder;
use crate::error::{WorkerError, WorkerResult};
use crate::repo::{HttpRepository, MediaRepository, SubtitleRepository};
use crate::subtitle::SubtitleGenerator;
use crate::translate::TranslationClient;

/// Shared state for all pipelines on one worker instance.
pub struct WorkerContext {
    pub config: WorkerConfig,
    pub store: ObjectStore,
    pub media_repo: Arc<dyn MediaRepository>,
    pub subtitle_repo: Arc<dyn SubtitleRepository>,
    pub progress: ProgressChannel,
    pub encode_status: StatusBoard,
    pub subtitle_status: StatusBoard,
    pub translator: TranslationClient,
}

impl WorkerContext {
    /// Build a production context from the environment.
    pub fn from_env(config: WorkerConfig) -> WorkerResult<Self> {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let repo = Arc::new(HttpRepository::from_env()?);

        Ok(Self {
            config,
            store: ObjectStore::from_env()?,
            media_repo: repo.clone(),
            subtitle_repo: repo,
            progress: ProgressChannel::new(&redis_url)?,
            encode_status: StatusBoard::new(&redis_url, "encode")?,
            subtitle_status: StatusBoard::new(&redis_url, "subtitle")?,
            translator: TranslationClient::from_env()?,
        })
    }
}

/// Await a fallible operation under an explicit deadline.
pub(crate) async fn with_deadline<T, E, F>(
    deadline: Duration,
    what: &str,
    fut: F,
) -> WorkerResult<T>
where
    F: Future<Output = Result<T, E>>,
    WorkerError: From<E>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result.map_err(WorkerError::from),
        Err(_) => Err(WorkerError::job_failed(format!(
            "{} timed out after {}s",
            what,
            deadline.as_secs()
        ))),
    }
}

/// Poll loop for the transcoding pipeline.
pub async fn run_encode_loop(
    ctx: Arc<WorkerContext>,
    queue: Arc<JobQueue>,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("Encode worker polling topic '{}'", ENCODE_TOPIC);

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = shutdown.changed() => {}
            popped = queue.blocking_pop::<EncodeJob>(ENCODE_TOPIC, ctx.config.poll_timeout) => {
                match popped {
                    Ok(Some(job)) => {
                        metrics::counter!("vod_encode_jobs_started_total").increment(1);
                        if let Err(e) = Transcoder::new(&ctx).run(&job).await {
                            // Terminal state is already persisted and
                            // published; the loop only records the outcome.
                            warn!(job_id = %job.job_id, "Encode job ended in error: {}", e);
                        }
                    }
                    Ok(None) => {
                        if let Ok(depth) = queue.len(ENCODE_TOPIC).await {
                            metrics::gauge!("vod_queue_depth", "topic" => ENCODE_TOPIC)
                                .set(depth as f64);
                        }
                    }
                    Err(e) => {
                        warn!("Queue error on '{}': {}", ENCODE_TOPIC, e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }
    }

    info!("Encode worker stopped");
}

/// Poll loop for the subtitle pipeline.
pub async fn run_subtitle_loop(
    ctx: Arc<WorkerContext>,
    queue: Arc<JobQueue>,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("Subtitle worker polling topic '{}'", SUBTITLE_TOPIC);

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = shutdown.changed() => {}
            popped = queue.blocking_pop::<SubtitleJob>(SUBTITLE_TOPIC, ctx.config.poll_timeout) => {
                match popped {
                    Ok(Some(job)) => {
                        metrics::counter!("vod_subtitle_jobs_started_total").increment(1);
                        if let Err(e) = SubtitleGenerator::new(&ctx).run(&job).await {
                            warn!(job_id = %job.job_id, "Subtitle job ended in error: {}", e);
                        }
                    }
                    Ok(None) => {
                        if let Ok(depth) = queue.len(SUBTITLE_TOPIC).await {
                            metrics::gauge!("vod_queue_depth", "topic" => SUBTITLE_TOPIC)
                                .set(depth as f64);
                        }
                    }
                    Err(e) => {
                        warn!("Queue error on '{}': {}", SUBTITLE_TOPIC, e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }
    }

    info!("Subtitle worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_deadline_passes_result_through() {
        let result: WorkerResult<u32> = with_deadline(
            Duration::from_secs(1),
            "fast op",
            async { Ok::<_, WorkerError>(7) },
        )
        .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_with_deadline_times_out() {
        let result: WorkerResult<u32> = with_deadline(
            Duration::from_millis(20),
            "slow op",
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, WorkerError>(7)
            },
        )
        .await;

        match result {
            Err(WorkerError::JobFailed(msg)) => assert!(msg.contains("slow op")),
            other => panic!("expected timeout failure, got {:?}", other),
        }
    }
}
