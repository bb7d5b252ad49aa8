//! Pipeline claim/rejection semantics against an in-memory repository.
//!
//! The object store, Redis, and translator endpoints point at unreachable
//! addresses, so any job that passes its pre-flight guard fails at the
//! download step, which is exactly what these tests need: they assert on
//! the guard decisions and on how failure is persisted, not on encoding.

use std::sync::Arc;
use std::time::Duration;

use vod_models::{
    EncodeJob, EncodingStatus, MediaId, MediaUnit, SubtitleId, SubtitleJob, SubtitleRecord,
    SubtitleStatus,
};
use vod_queue::{ProgressChannel, StatusBoard};
use vod_storage::{ObjectStore, StoreConfig};
use vod_worker::{
    InMemoryRepository, SubtitleGenerator, Transcoder, TranslationClient, WorkerConfig,
    WorkerContext, WorkerError,
};

fn test_context(repo: Arc<InMemoryRepository>, work_dir: &std::path::Path) -> WorkerContext {
    let config = WorkerConfig {
        work_dir: work_dir.to_string_lossy().to_string(),
        transfer_timeout: Duration::from_secs(3),
        ..WorkerConfig::default()
    };

    WorkerContext {
        config,
        store: ObjectStore::new(StoreConfig {
            endpoint_url: "http://127.0.0.1:1".into(),
            access_key_id: "test".into(),
            secret_access_key: "test".into(),
            bucket_name: "test".into(),
            region: "auto".into(),
            public_base_url: "http://127.0.0.1:1/assets".into(),
        }),
        media_repo: repo.clone(),
        subtitle_repo: repo,
        progress: ProgressChannel::new("redis://127.0.0.1:1").unwrap(),
        encode_status: StatusBoard::new("redis://127.0.0.1:1", "encode").unwrap(),
        subtitle_status: StatusBoard::new("redis://127.0.0.1:1", "subtitle").unwrap(),
        translator: TranslationClient::new("http://127.0.0.1:1", None).unwrap(),
    }
}

#[tokio::test]
async fn encode_rejects_unit_already_processing() {
    let repo = Arc::new(InMemoryRepository::new());
    let media_id = MediaId::from_string("m-busy");

    let mut unit = MediaUnit::new(media_id.clone(), 1, "uploads/m-busy.mp4");
    unit.begin_processing();
    repo.insert_media(unit).await;

    let work = tempfile::tempdir().unwrap();
    let ctx = test_context(repo.clone(), work.path());

    let job = EncodeJob::new(media_id.clone(), "uploads/m-busy.mp4");
    let result = Transcoder::new(&ctx).run(&job).await;

    assert!(matches!(result, Err(WorkerError::AlreadyProcessing(_))));

    // The in-flight run's record is untouched
    let after = repo.fetch_media(&media_id).await.unwrap().unwrap();
    assert_eq!(after.encoding_status, EncodingStatus::Processing);
    assert!(after.encoding_error.is_none());
}

#[tokio::test]
async fn encode_rejects_missing_record() {
    let repo = Arc::new(InMemoryRepository::new());
    let work = tempfile::tempdir().unwrap();
    let ctx = test_context(repo, work.path());

    let job = EncodeJob::new(MediaId::from_string("ghost"), "uploads/ghost.mp4");
    let result = Transcoder::new(&ctx).run(&job).await;

    assert!(matches!(result, Err(WorkerError::RecordNotFound(_))));
}

#[tokio::test]
async fn encode_accepts_failed_unit_for_manual_retry() {
    let repo = Arc::new(InMemoryRepository::new());
    let media_id = MediaId::from_string("m-retry");

    let mut unit = MediaUnit::new(media_id.clone(), 2, "uploads/m-retry.mp4");
    unit.begin_processing();
    unit.fail("previous attempt died");
    repo.insert_media(unit).await;

    let work = tempfile::tempdir().unwrap();
    let ctx = test_context(repo.clone(), work.path());

    let job = EncodeJob::new(media_id.clone(), "uploads/m-retry.mp4");
    let result = Transcoder::new(&ctx).run(&job).await;

    // The retry is accepted (no rejection) and restarts the pipeline; it
    // then fails at the unreachable store and writes a fresh terminal state.
    let err = result.unwrap_err();
    assert!(!err.is_rejection());

    let after = repo.fetch_media(&media_id).await.unwrap().unwrap();
    assert_eq!(after.encoding_status, EncodingStatus::Failed);
    let message = after.encoding_error.unwrap();
    assert_ne!(message, "previous attempt died");
}

#[tokio::test]
async fn subtitle_rejects_record_in_flight() {
    let repo = Arc::new(InMemoryRepository::new());
    let media_id = MediaId::from_string("m-sub");

    let mut record = SubtitleRecord::new(media_id.clone(), 1, "auto", "es");
    record.set_stage(SubtitleStatus::Transcribing);
    let subtitle_id = record.subtitle_id.clone();
    repo.insert_subtitle(record).await;

    let work = tempfile::tempdir().unwrap();
    let ctx = test_context(repo.clone(), work.path());

    let job = SubtitleJob::new(
        subtitle_id.clone(),
        media_id,
        "uploads/m-sub.mp4",
        "auto",
        "es",
    );
    let result = SubtitleGenerator::new(&ctx).run(&job).await;

    assert!(matches!(result, Err(WorkerError::DuplicateSubtitle(_))));

    let after = repo.fetch_subtitle(&subtitle_id).await.unwrap().unwrap();
    assert_eq!(after.status, SubtitleStatus::Transcribing);
    assert!(after.error.is_none());
}

#[tokio::test]
async fn subtitle_overwrites_terminal_record() {
    let repo = Arc::new(InMemoryRepository::new());
    let media_id = MediaId::from_string("m-redo");

    let mut record = SubtitleRecord::new(media_id.clone(), 1, "en", "fr");
    record.complete("1\n00:00:00,000 --> 00:00:01,000\nOld\n", "http://old/track");
    let subtitle_id = record.subtitle_id.clone();
    repo.insert_subtitle(record).await;

    let work = tempfile::tempdir().unwrap();
    let ctx = test_context(repo.clone(), work.path());

    let job = SubtitleJob::new(
        subtitle_id.clone(),
        media_id,
        "uploads/m-redo.mp4",
        "en",
        "fr",
    );
    let result = SubtitleGenerator::new(&ctx).run(&job).await;

    // Not rejected: a terminal record is fair game for a re-run. The
    // re-run then fails at the unreachable store and lands in Failed.
    let err = result.unwrap_err();
    assert!(!err.is_rejection());

    let after = repo.fetch_subtitle(&subtitle_id).await.unwrap().unwrap();
    assert_eq!(after.status, SubtitleStatus::Failed);
    assert!(after.error.is_some());
}

#[tokio::test]
async fn subtitle_failure_freezes_progress_at_last_milestone() {
    let repo = Arc::new(InMemoryRepository::new());
    let media_id = MediaId::from_string("m-frozen");

    let record = SubtitleRecord::new(media_id.clone(), 1, "auto", "de");
    let subtitle_id = record.subtitle_id.clone();
    repo.insert_subtitle(record).await;

    let work = tempfile::tempdir().unwrap();
    let ctx = test_context(repo.clone(), work.path());

    let job = SubtitleJob::new(
        subtitle_id.clone(),
        media_id,
        "uploads/m-frozen.mp4",
        "auto",
        "de",
    );
    let _ = SubtitleGenerator::new(&ctx).run(&job).await;

    // The job entered Extracting (progress 5) and died at the download;
    // the terminal write must not move progress.
    let after = repo.fetch_subtitle(&subtitle_id).await.unwrap().unwrap();
    assert_eq!(after.status, SubtitleStatus::Failed);
    assert_eq!(after.progress, 5);
}
