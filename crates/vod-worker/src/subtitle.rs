//! Subtitle pipeline: raw upload → transcribed, optionally translated SRT.

use tracing::{error, warn};

use vod_media::{
    extract_audio, to_srt, transcribe_audio, AudioExtractContext, ProcessRunner, SubtitleSegment,
};
use vod_media::srt::validate_transcript;
use vod_models::{truncate_error, JobId, SubtitleJob, SubtitleRecord, SubtitleStatus};
use vod_storage::content_type_for;

use crate::error::{WorkerError, WorkerResult};
use crate::executor::{with_deadline, WorkerContext};
use crate::keys;
use crate::logging::JobLogger;
use crate::progress::ProgressGate;
use crate::scratch::ScratchDir;
use crate::translate::detect_language;

/// Subtitle pipeline driver.
pub struct SubtitleGenerator<'a> {
    ctx: &'a WorkerContext,
}

impl<'a> SubtitleGenerator<'a> {
    pub fn new(ctx: &'a WorkerContext) -> Self {
        Self { ctx }
    }

    /// Run one subtitle job to a terminal state.
    ///
    /// A record that is non-terminal and not Queued belongs to another
    /// in-flight run and rejects this job without being touched; a
    /// terminal record is overwritten (upsert on the same
    /// `(media, target_language)` key).
    pub async fn run(&self, job: &SubtitleJob) -> WorkerResult<()> {
        let logger = JobLogger::new(&job.job_id, "subtitle");
        logger.start(&format!(
            "media {} {} -> {}",
            job.media_id, job.source_language, job.target_language
        ));

        let mut record = self
            .ctx
            .subtitle_repo
            .fetch_subtitle(&job.subtitle_id)
            .await?
            .ok_or_else(|| WorkerError::RecordNotFound(job.subtitle_id.to_string()))?;

        if !record.status.is_terminal() && record.status != SubtitleStatus::Queued {
            logger.warning("subtitle already in flight, rejecting duplicate job");
            return Err(WorkerError::DuplicateSubtitle(format!(
                "{}/{}",
                job.media_id, job.target_language
            )));
        }

        // Re-running over a terminal record restarts the lifecycle.
        record.progress = 0;
        record.error = None;

        let mut gate = ProgressGate::new();

        // The job is already consumed from the queue; even scratch setup
        // failure must leave a terminal record behind.
        let scratch = match ScratchDir::create(&self.ctx.config.work_dir, &job.job_id).await {
            Ok(scratch) => scratch,
            Err(e) => {
                logger.failure(&e.to_string());
                self.fail_record(&mut record, &mut gate, &job.job_id, &e).await;
                return Err(e);
            }
        };

        let result = self
            .pipeline(job, &mut record, &mut gate, &scratch, &logger)
            .await;
        scratch.cleanup().await;

        match result {
            Ok(()) => {
                logger.completion(&format!(
                    "track at {}",
                    record.track_url.as_deref().unwrap_or("?")
                ));
                Ok(())
            }
            Err(e) => {
                logger.failure(&e.to_string());
                self.fail_record(&mut record, &mut gate, &job.job_id, &e).await;
                Err(e)
            }
        }
    }

    async fn pipeline(
        &self,
        job: &SubtitleJob,
        record: &mut SubtitleRecord,
        gate: &mut ProgressGate,
        scratch: &ScratchDir,
        logger: &JobLogger,
    ) -> WorkerResult<()> {
        let config = &self.ctx.config;

        // Extracting: download source, pull a transcription-ready track
        self.advance(record, gate, &job.job_id, Some(SubtitleStatus::Extracting), 5)
            .await?;

        let source = scratch.join("source.mp4");
        with_deadline(
            config.transfer_timeout,
            "source download",
            self.ctx.store.download_file(&job.source_key, &source),
        )
        .await?;

        let audio = scratch.join("audio.wav");
        let extract_ctx = AudioExtractContext::new(&source, &audio, config.audio_cap_secs);
        let runner = ProcessRunner::new(config.extract_timeout);
        let strategy = extract_audio(&runner, &extract_ctx).await?;
        logger.stage("extract", &format!("audio extracted via {} strategy", strategy));
        self.advance(record, gate, &job.job_id, None, 30).await?;

        // Transcribing
        self.advance(record, gate, &job.job_id, Some(SubtitleStatus::Transcribing), 35)
            .await?;

        let whisper_lang = if job.is_auto_language() {
            None
        } else {
            Some(job.source_language.as_str())
        };
        let transcribe_runner = ProcessRunner::new(config.transcribe_timeout);
        let segments =
            transcribe_audio(&transcribe_runner, &audio, scratch.path(), whisper_lang).await?;
        validate_transcript(&segments, config.audio_cap_secs)?;
        logger.stage("transcribe", &format!("{} segments", segments.len()));
        self.advance(record, gate, &job.job_id, None, 55).await?;

        // Translating, skipped when source already matches target
        let source_language = if job.is_auto_language() {
            let joined: String = segments
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            detect_language(&joined).to_string()
        } else {
            job.source_language.to_ascii_lowercase()
        };

        let segments = if !source_language.eq_ignore_ascii_case(&job.target_language) {
            self.advance(record, gate, &job.job_id, Some(SubtitleStatus::Translating), 60)
                .await?;
            self.translate_segments(job, record, gate, &segments, &source_language, logger)
                .await?
        } else {
            logger.stage("translate", "source matches target, skipping translation");
            segments
        };

        // Uploading
        self.advance(record, gate, &job.job_id, Some(SubtitleStatus::Uploading), 90)
            .await?;

        let content = to_srt(&segments);
        let key = keys::subtitle_key(&record.media_id, record.sequence_number, &record.target_language);
        let track_url = with_deadline(
            config.transfer_timeout,
            "track upload",
            self.ctx
                .store
                .upload_bytes(content.clone().into_bytes(), &key, content_type_for(&key)),
        )
        .await?;

        // Terminal write, then terminal event
        let prior = record.status;
        record.complete(content, track_url);
        self.ctx.subtitle_repo.update_subtitle(record).await?;
        gate.observe(100);
        gate.seal();
        self.ctx
            .subtitle_status
            .transition(Some(prior.as_str()), SubtitleStatus::Completed.as_str())
            .await
            .ok();
        self.ctx
            .progress
            .completed(&job.job_id, SubtitleStatus::Completed.as_str())
            .await
            .ok();

        metrics::counter!("vod_subtitle_jobs_completed_total").increment(1);
        Ok(())
    }

    /// Translate all segments in fixed-size batches.
    ///
    /// Batch count mismatches surface from the client as hard failures;
    /// the final alignment check exists only as a logged, degraded
    /// fallback and should be unreachable.
    async fn translate_segments(
        &self,
        job: &SubtitleJob,
        record: &mut SubtitleRecord,
        gate: &mut ProgressGate,
        segments: &[SubtitleSegment],
        source_language: &str,
        logger: &JobLogger,
    ) -> WorkerResult<Vec<SubtitleSegment>> {
        let batch_size = self.ctx.config.translate_batch_size.max(1);
        let batches: Vec<&[SubtitleSegment]> = segments.chunks(batch_size).collect();
        let total = batches.len();

        let mut translated: Vec<SubtitleSegment> = Vec::with_capacity(segments.len());
        for (i, batch) in batches.into_iter().enumerate() {
            let texts: Vec<String> = batch.iter().map(|s| s.text.clone()).collect();
            let out = self
                .ctx
                .translator
                .translate_batch(&texts, source_language, &job.target_language)
                .await?;

            // Only text changes; indices and timestamps are preserved.
            translated.extend(
                batch
                    .iter()
                    .zip(out)
                    .map(|(seg, text)| SubtitleSegment { text, ..seg.clone() }),
            );

            let progress = 60 + ((25 * (i + 1)) / total) as u8;
            self.advance(record, gate, &job.job_id, None, progress).await?;
        }

        let (aligned, degraded) = align_segments(segments, translated);
        if degraded {
            logger.warning("translated track realigned to source segment count");
        }
        Ok(aligned)
    }

    /// Persist a stage/progress change, then publish it.
    async fn advance(
        &self,
        record: &mut SubtitleRecord,
        gate: &mut ProgressGate,
        job_id: &JobId,
        stage: Option<SubtitleStatus>,
        progress: u8,
    ) -> WorkerResult<()> {
        if let Some(next) = stage {
            let prior = record.status;
            record.set_stage(next);
            self.ctx
                .subtitle_status
                .transition(Some(prior.as_str()), next.as_str())
                .await
                .ok();
        }
        if let Some(p) = gate.observe(progress) {
            record.progress = p;
        }
        self.ctx.subtitle_repo.update_subtitle(record).await?;
        self.ctx
            .progress
            .status(job_id, record.status.as_str(), record.progress)
            .await
            .ok();
        Ok(())
    }

    /// Terminal failure write with a secondary fallback attempt.
    async fn fail_record(
        &self,
        record: &mut SubtitleRecord,
        gate: &mut ProgressGate,
        job_id: &JobId,
        cause: &WorkerError,
    ) {
        let message = truncate_error(&cause.to_string());
        let prior = record.status;

        record.fail(&message);
        if let Err(write_err) = self.ctx.subtitle_repo.update_subtitle(record).await {
            error!("Failed to persist subtitle failure: {}", write_err);
            record.fail("subtitle generation failed");
            if let Err(e) = self.ctx.subtitle_repo.update_subtitle(record).await {
                error!("Secondary failure write also failed: {}", e);
            }
        }

        let final_progress = gate.last();
        gate.seal();

        self.ctx
            .subtitle_status
            .transition(Some(prior.as_str()), SubtitleStatus::Failed.as_str())
            .await
            .ok();
        if let Err(e) = self
            .ctx
            .progress
            .failed(job_id, SubtitleStatus::Failed.as_str(), final_progress, message.as_str())
            .await
        {
            warn!("Failed to publish failure event: {}", e);
        }

        metrics::counter!("vod_subtitle_jobs_failed_total").increment(1);
    }
}

/// Force the translated track back onto the source segment count.
///
/// Missing entries are padded with the source-language segment, extras
/// are dropped. Returns whether any realignment happened so the caller
/// can log the degraded outcome.
fn align_segments(
    original: &[SubtitleSegment],
    mut translated: Vec<SubtitleSegment>,
) -> (Vec<SubtitleSegment>, bool) {
    if translated.len() == original.len() {
        return (translated, false);
    }

    warn!(
        expected = original.len(),
        actual = translated.len(),
        "Translated segment count diverged from source, realigning"
    );

    translated.truncate(original.len());
    while translated.len() < original.len() {
        translated.push(original[translated.len()].clone());
    }
    (translated, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(index: u32, text: &str) -> SubtitleSegment {
        SubtitleSegment {
            index,
            start_ms: u64::from(index) * 1000,
            end_ms: u64::from(index) * 1000 + 900,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_align_exact_match_untouched() {
        let original = vec![seg(1, "a"), seg(2, "b")];
        let translated = vec![seg(1, "x"), seg(2, "y")];
        let (aligned, degraded) = align_segments(&original, translated);
        assert!(!degraded);
        assert_eq!(aligned[0].text, "x");
        assert_eq!(aligned[1].text, "y");
    }

    #[test]
    fn test_align_pads_missing_with_source_text() {
        let original = vec![seg(1, "a"), seg(2, "b"), seg(3, "c")];
        let translated = vec![seg(1, "x")];
        let (aligned, degraded) = align_segments(&original, translated);
        assert!(degraded);
        assert_eq!(aligned.len(), 3);
        assert_eq!(aligned[1].text, "b");
        assert_eq!(aligned[2].text, "c");
        // Timestamps always come from the source
        assert_eq!(aligned[2].start_ms, 3000);
    }

    #[test]
    fn test_align_truncates_extras() {
        let original = vec![seg(1, "a")];
        let translated = vec![seg(1, "x"), seg(2, "y")];
        let (aligned, degraded) = align_segments(&original, translated);
        assert!(degraded);
        assert_eq!(aligned.len(), 1);
        assert_eq!(aligned[0].text, "x");
    }
}
