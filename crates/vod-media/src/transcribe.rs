//! Whisper speech-to-text invocation.

use std::path::Path;

use tracing::info;

use crate::error::{MediaError, MediaResult};
use crate::runner::ProcessRunner;
use crate::srt::{parse_srt, SubtitleSegment};

/// Default whisper model.
const WHISPER_MODEL: &str = "base";

/// Build the whisper argument vector.
///
/// `language` of `None` requests auto-detection.
fn whisper_args(audio: &Path, out_dir: &Path, language: Option<&str>) -> Vec<String> {
    let mut args = vec![
        audio.to_string_lossy().to_string(),
        "--model".to_string(),
        WHISPER_MODEL.to_string(),
        "--output_format".to_string(),
        "srt".to_string(),
        "--output_dir".to_string(),
        out_dir.to_string_lossy().to_string(),
        "--verbose".to_string(),
        "False".to_string(),
    ];

    if let Some(lang) = language {
        args.push("--language".to_string());
        args.push(lang.to_string());
    }

    args
}

/// Transcribe an extracted audio track into timed-text segments.
///
/// Runs the whisper CLI, which writes `<audio-stem>.srt` into `out_dir`,
/// then parses that file. Validation of the parsed track (zero segments,
/// collapsed single cue) is the caller's responsibility since the cap
/// duration lives there.
pub async fn transcribe_audio(
    runner: &ProcessRunner,
    audio: &Path,
    out_dir: &Path,
    language: Option<&str>,
) -> MediaResult<Vec<SubtitleSegment>> {
    crate::command::check_whisper()?;

    info!(
        audio = %audio.display(),
        language = language.unwrap_or("auto"),
        "Transcribing audio"
    );

    let args = whisper_args(audio, out_dir, language);
    runner.run("whisper", &args).await?;

    let stem = audio
        .file_stem()
        .ok_or_else(|| MediaError::InvalidMedia(format!("bad audio path: {}", audio.display())))?;
    let srt_path = out_dir.join(stem).with_extension("srt");

    if !srt_path.is_file() {
        return Err(MediaError::subtitle_parse(format!(
            "transcriber produced no output at {}",
            srt_path.display()
        )));
    }

    let content = tokio::fs::read_to_string(&srt_path).await?;
    Ok(parse_srt(&content))
}
