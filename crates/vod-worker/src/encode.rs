//! Transcoding pipeline: raw upload → adaptive HLS asset.

use chrono::Utc;
use tracing::{error, warn};

use vod_media::hls::MASTER_PLAYLIST;
use vod_media::{
    encode_rung, probe_media, write_master_playlist, EncodeContext, MediaInfo, ProcessRunner,
};
use vod_models::{
    select_rungs, truncate_error, EncodeJob, EncodingStatus, JobId, MediaUnit, QualityRung,
};
use vod_storage::content_type_for;

use crate::error::{WorkerError, WorkerResult};
use crate::executor::{with_deadline, WorkerContext};
use crate::keys;
use crate::logging::JobLogger;
use crate::progress::ProgressGate;
use crate::scratch::ScratchDir;

/// Transcoding pipeline driver.
pub struct Transcoder<'a> {
    ctx: &'a WorkerContext,
}

impl<'a> Transcoder<'a> {
    pub fn new(ctx: &'a WorkerContext) -> Self {
        Self { ctx }
    }

    /// Run one encode job to a terminal state.
    ///
    /// Pre-flight rejections (unit missing or already processing) return
    /// an error without touching the record. Any failure after the claim
    /// writes Failed plus a failure event, and scratch space is removed
    /// on every path.
    pub async fn run(&self, job: &EncodeJob) -> WorkerResult<()> {
        let logger = JobLogger::new(&job.job_id, "encode");
        logger.start(&format!("media {} from {}", job.media_id, job.source_key));

        let mut unit = self
            .ctx
            .media_repo
            .fetch_media(&job.media_id)
            .await?
            .ok_or_else(|| WorkerError::RecordNotFound(job.media_id.to_string()))?;

        if !unit.encoding_status.can_begin_encode() {
            logger.warning(&format!(
                "unit is {}, rejecting encode request",
                unit.encoding_status
            ));
            return Err(match unit.encoding_status {
                EncodingStatus::Processing => {
                    WorkerError::AlreadyProcessing(job.media_id.to_string())
                }
                status => WorkerError::NotEncodable(format!(
                    "{} is {}, reset to pending first",
                    job.media_id, status
                )),
            });
        }
        let prior_status = unit.encoding_status;

        let mut gate = ProgressGate::new();

        // Claim the unit: persist first, publish second.
        unit.begin_processing();
        self.ctx.media_repo.update_media(&unit).await?;
        self.ctx
            .encode_status
            .transition(Some(prior_status.as_str()), EncodingStatus::Processing.as_str())
            .await
            .ok();
        gate.observe(0);
        self.ctx
            .progress
            .status(&job.job_id, EncodingStatus::Processing.as_str(), 0)
            .await
            .ok();

        // Once the unit is claimed every failure must land in a terminal
        // write, scratch setup included.
        let scratch = match ScratchDir::create(&self.ctx.config.work_dir, &job.job_id).await {
            Ok(scratch) => scratch,
            Err(e) => {
                logger.failure(&e.to_string());
                self.fail_unit(&mut unit, &mut gate, &job.job_id, &e).await;
                return Err(e);
            }
        };

        let result = self.pipeline(job, &mut unit, &mut gate, &scratch, &logger).await;
        scratch.cleanup().await;

        match result {
            Ok(()) => {
                logger.completion(&format!(
                    "media {} encoded, manifest at {}",
                    job.media_id,
                    unit.manifest_url.as_deref().unwrap_or("?")
                ));
                Ok(())
            }
            Err(e) => {
                logger.failure(&e.to_string());
                self.fail_unit(&mut unit, &mut gate, &job.job_id, &e).await;
                Err(e)
            }
        }
    }

    async fn pipeline(
        &self,
        job: &EncodeJob,
        unit: &mut MediaUnit,
        gate: &mut ProgressGate,
        scratch: &ScratchDir,
        logger: &JobLogger,
    ) -> WorkerResult<()> {
        let config = &self.ctx.config;

        // Download the source blob
        logger.stage("download", "downloading source");
        let source = scratch.join("source.mp4");
        with_deadline(
            config.transfer_timeout,
            "source download",
            self.ctx.store.download_file(&job.source_key, &source),
        )
        .await?;

        let size = tokio::fs::metadata(&source).await.map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(WorkerError::invalid_source(format!(
                "source {} is empty",
                job.source_key
            )));
        }
        self.report(unit, gate, &job.job_id, 5).await?;

        // Probe; probe failures fall back to safe defaults rather than
        // aborting: some playable output beats a hard failure.
        let info = match probe_media(&source, config.probe_timeout).await {
            Ok(info) => info,
            Err(e) => {
                logger.warning(&format!("probe failed ({}), assuming 1080p", e));
                MediaInfo::fallback()
            }
        };
        self.report(unit, gate, &job.job_id, 10).await?;

        // Quality ladder: never empty
        let rungs = select_rungs(info.height);
        logger.stage(
            "ladder",
            &format!(
                "source {}x{}, encoding rungs: {}",
                info.width,
                info.height,
                rungs_summary(&rungs)
            ),
        );

        // Encode each rung sequentially to bound peak load on the host
        let runner = ProcessRunner::new(config.encode_timeout);
        let out_root = scratch.join("out");
        for (i, rung) in rungs.iter().enumerate() {
            let rung_dir = out_root.join(rung.name);
            let ectx = EncodeContext::new(&source, &rung_dir, *rung);

            let strategy = encode_rung(&runner, &ectx).await?;
            logger.stage(rung.name, &format!("encoded via {} strategy", strategy));

            let progress = 10 + (70 * (i as u8 + 1)) / rungs.len() as u8;
            self.report(unit, gate, &job.job_id, progress).await?;
        }

        // Master playlist, then upload: master first, rung directories after
        let master = write_master_playlist(&rungs);
        let master_key = keys::master_key(&unit.media_id, unit.sequence_number);
        self.report(unit, gate, &job.job_id, 85).await?;

        logger.stage("upload", "uploading artifacts");
        let manifest_url = with_deadline(
            config.transfer_timeout,
            "manifest upload",
            self.ctx.store.upload_bytes(
                master.into_bytes(),
                &master_key,
                content_type_for(MASTER_PLAYLIST),
            ),
        )
        .await?;

        for (i, rung) in rungs.iter().enumerate() {
            let prefix = keys::rung_prefix(&unit.media_id, unit.sequence_number, rung.name);
            with_deadline(
                config.transfer_timeout,
                "rung upload",
                self.ctx.store.upload_dir(out_root.join(rung.name), &prefix),
            )
            .await?;

            let progress = 85 + (13 * (i as u8 + 1)) / rungs.len() as u8;
            self.report(unit, gate, &job.job_id, progress).await?;
        }

        // Terminal write, then terminal event
        unit.complete(manifest_url, info.duration);
        self.ctx.media_repo.update_media(unit).await?;
        gate.observe(100);
        gate.seal();
        self.ctx
            .encode_status
            .transition(
                Some(EncodingStatus::Processing.as_str()),
                EncodingStatus::Completed.as_str(),
            )
            .await
            .ok();
        self.ctx
            .progress
            .completed(&job.job_id, EncodingStatus::Completed.as_str())
            .await
            .ok();

        metrics::counter!("vod_encode_jobs_completed_total").increment(1);
        Ok(())
    }

    /// Persist an intermediate progress value, then publish it.
    async fn report(
        &self,
        unit: &mut MediaUnit,
        gate: &mut ProgressGate,
        job_id: &JobId,
        progress: u8,
    ) -> WorkerResult<()> {
        if let Some(p) = gate.observe(progress) {
            unit.encoding_progress = p;
            unit.updated_at = Utc::now();
            self.ctx.media_repo.update_media(unit).await?;
            self.ctx
                .progress
                .status(job_id, EncodingStatus::Processing.as_str(), p)
                .await
                .ok();
        }
        Ok(())
    }

    /// Terminal failure write with a secondary fallback attempt.
    async fn fail_unit(
        &self,
        unit: &mut MediaUnit,
        gate: &mut ProgressGate,
        job_id: &JobId,
        cause: &WorkerError,
    ) {
        let message = truncate_error(&cause.to_string());

        unit.fail(&message);
        if let Err(write_err) = self.ctx.media_repo.update_media(unit).await {
            error!("Failed to persist encode failure: {}", write_err);
            // The failure must never be silently swallowed; retry once
            // with a generic message in case the original was the problem.
            unit.fail("encoding failed");
            if let Err(e) = self.ctx.media_repo.update_media(unit).await {
                error!("Secondary failure write also failed: {}", e);
            }
        }

        let final_progress = gate.last();
        gate.seal();

        self.ctx
            .encode_status
            .transition(
                Some(EncodingStatus::Processing.as_str()),
                EncodingStatus::Failed.as_str(),
            )
            .await
            .ok();
        if let Err(e) = self
            .ctx
            .progress
            .failed(job_id, EncodingStatus::Failed.as_str(), final_progress, message.as_str())
            .await
        {
            warn!("Failed to publish failure event: {}", e);
        }

        metrics::counter!("vod_encode_jobs_failed_total").increment(1);
    }
}

fn rungs_summary(rungs: &[&'static QualityRung]) -> String {
    rungs
        .iter()
        .map(|r| r.name)
        .collect::<Vec<_>>()
        .join(",")
}
